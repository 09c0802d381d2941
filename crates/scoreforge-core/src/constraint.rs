//! Constraint identification and classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference to a constraint for identification.
///
/// # Example
///
/// ```
/// use scoreforge_core::ConstraintRef;
///
/// let cr = ConstraintRef::new("cloud", "requiredCpuPower");
/// assert_eq!(cr.full_name(), "cloud/requiredCpuPower");
///
/// let simple = ConstraintRef::new("", "Simple");
/// assert_eq!(simple.full_name(), "Simple");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintRef {
    /// Package/module containing the constraint.
    pub package: String,
    /// Name of the constraint.
    pub name: String,
}

impl ConstraintRef {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Returns the fully qualified name.
    pub fn full_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.package, self.name)
        }
    }
}

impl fmt::Display for ConstraintRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}/{}", self.package, self.name)
        }
    }
}

/// How a constraint's matches move the score.
///
/// `Penalty` and `Reward` require non-negative match weights. `Mixed`
/// accepts any sign: a positive weight rewards, a negative one penalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactType {
    /// Subtract from score.
    Penalty,
    /// Add to score.
    Reward,
    /// Add the signed weight to the score.
    Mixed,
}

impl ImpactType {
    /// Whether negative match weights are legal for this impact type.
    pub fn accepts_negative_weights(self) -> bool {
        matches!(self, ImpactType::Mixed)
    }
}
