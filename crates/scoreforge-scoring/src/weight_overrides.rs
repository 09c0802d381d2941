// Runtime constraint weight configuration.
//
// Overrides are applied when a session factory is built, so the same
// constraint definitions can be scored with different weights.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use scoreforge_core::{ConstraintRef, Score};

use crate::stream::Constraint;

// Holds runtime overrides for constraint weights, keyed by constraint name
// or by full name (`package/name`). A full-name entry wins over a bare name.
#[derive(Clone)]
pub struct ConstraintWeightOverrides<Sc: Score> {
    weights: HashMap<String, Sc>,
}

impl<Sc: Score> Debug for ConstraintWeightOverrides<Sc> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintWeightOverrides")
            .field("count", &self.weights.len())
            .finish()
    }
}

impl<Sc: Score> Default for ConstraintWeightOverrides<Sc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Sc: Score> ConstraintWeightOverrides<Sc> {
    pub fn new() -> Self {
        Self {
            weights: HashMap::new(),
        }
    }

    pub fn from_pairs<I, N>(iter: I) -> Self
    where
        I: IntoIterator<Item = (N, Sc)>,
        N: Into<String>,
    {
        let weights = iter.into_iter().map(|(n, w)| (n.into(), w)).collect();
        Self { weights }
    }

    pub fn put<N: Into<String>>(&mut self, name: N, weight: Sc) {
        self.weights.insert(name.into(), weight);
    }

    pub fn remove(&mut self, name: &str) -> Option<Sc> {
        self.weights.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Sc> {
        self.weights.get(name)
    }

    // Looks up a constraint by full name, then by bare name.
    pub fn get_for(&self, constraint: &ConstraintRef) -> Option<Sc> {
        self.weights
            .get(&constraint.full_name())
            .or_else(|| self.weights.get(&constraint.name))
            .copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.weights.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn clear(&mut self) {
        self.weights.clear();
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    // Returns `constraint` with its weight replaced when overridden.
    pub fn apply(&self, constraint: Constraint<Sc>) -> Constraint<Sc> {
        match self.get_for(constraint.constraint_ref()) {
            Some(weight) => constraint.with_weight(weight),
            None => constraint,
        }
    }
}

// Source of constraint weights looked up by constraint reference.
pub trait WeightProvider<Sc: Score>: Send + Sync {
    fn weight(&self, constraint: &ConstraintRef) -> Option<Sc>;

    fn weight_or_default(&self, constraint: &ConstraintRef, default: Sc) -> Sc {
        self.weight(constraint).unwrap_or(default)
    }
}

impl<Sc: Score> WeightProvider<Sc> for ConstraintWeightOverrides<Sc> {
    fn weight(&self, constraint: &ConstraintRef) -> Option<Sc> {
        self.get_for(constraint)
    }
}

impl<Sc: Score> WeightProvider<Sc> for Arc<ConstraintWeightOverrides<Sc>> {
    fn weight(&self, constraint: &ConstraintRef) -> Option<Sc> {
        self.get_for(constraint)
    }
}

#[cfg(test)]
mod tests {
    use scoreforge_core::HardSoftScore;

    use super::*;
    use crate::stream::ConstraintFactory;

    #[test]
    fn test_full_name_wins_over_bare_name() {
        let mut overrides = ConstraintWeightOverrides::new();
        overrides.put("cpu", HardSoftScore::ONE_SOFT);
        overrides.put("cloud/cpu", HardSoftScore::ONE_HARD);

        let cloud = ConstraintRef::new("cloud", "cpu");
        let other = ConstraintRef::new("other", "cpu");
        assert_eq!(overrides.get_for(&cloud), Some(HardSoftScore::ONE_HARD));
        assert_eq!(overrides.weight(&other), Some(HardSoftScore::ONE_SOFT));
        assert_eq!(
            overrides.weight_or_default(&ConstraintRef::new("cloud", "ram"), HardSoftScore::ZERO),
            HardSoftScore::ZERO
        );
    }

    #[test]
    fn test_apply_replaces_weight() {
        let overrides = ConstraintWeightOverrides::from_pairs([("cpu", HardSoftScore::of(0, 7))]);
        let constraint = ConstraintFactory::new("cloud")
            .for_each(0)
            .penalize(HardSoftScore::ONE_SOFT)
            .as_constraint("cpu");

        assert_eq!(overrides.apply(constraint).weight(), HardSoftScore::of(0, 7));
        assert_eq!(overrides.len(), 1);
    }
}
