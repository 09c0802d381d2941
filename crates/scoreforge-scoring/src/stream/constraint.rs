use std::sync::Arc;

use scoreforge_core::{ConstraintRef, Expr, ImpactType, Score};

use super::StreamDef;
use crate::impact::ImpactKind;

/// How much one match weighs, relative to the constraint weight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum MatchWeight {
    /// Every match counts once.
    #[default]
    Unit,
    /// Evaluates to an `Int`.
    Int(Expr),
    /// Evaluates to a `Long` (an `Int` is widened).
    Long(Expr),
    /// Evaluates to a `Decimal`. Needs a decimal score type.
    Decimal(Expr),
}

impl MatchWeight {
    pub fn kind(&self) -> ImpactKind {
        match self {
            MatchWeight::Unit | MatchWeight::Int(_) => ImpactKind::Int,
            MatchWeight::Long(_) => ImpactKind::Long,
            MatchWeight::Decimal(_) => ImpactKind::Decimal,
        }
    }

    pub fn expr(&self) -> Option<&Expr> {
        match self {
            MatchWeight::Unit => None,
            MatchWeight::Int(e) | MatchWeight::Long(e) | MatchWeight::Decimal(e) => Some(e),
        }
    }
}

/// Terminal stage of a stream: how matches affect the score.
#[derive(Debug, Clone)]
pub struct ConstraintBuilder<Sc: Score> {
    stream: Arc<StreamDef>,
    package: Arc<str>,
    impact_type: ImpactType,
    weight: Sc,
    match_weight: MatchWeight,
}

impl<Sc: Score> ConstraintBuilder<Sc> {
    pub(crate) fn new(
        stream: Arc<StreamDef>,
        package: Arc<str>,
        impact_type: ImpactType,
        weight: Sc,
    ) -> Self {
        Self {
            stream,
            package,
            impact_type,
            weight,
            match_weight: MatchWeight::Unit,
        }
    }

    /// Multiplies the constraint weight by `weight`, an `Int` expression over
    /// the tuple.
    pub fn with_match_weight(mut self, weight: Expr) -> Self {
        self.match_weight = MatchWeight::Int(weight);
        self
    }

    pub fn with_long_match_weight(mut self, weight: Expr) -> Self {
        self.match_weight = MatchWeight::Long(weight);
        self
    }

    pub fn with_decimal_match_weight(mut self, weight: Expr) -> Self {
        self.match_weight = MatchWeight::Decimal(weight);
        self
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Finishes the constraint in the factory's package.
    pub fn as_constraint(self, name: impl Into<String>) -> Constraint<Sc> {
        let package = self.package.to_string();
        self.as_constraint_in(package, name)
    }

    pub fn as_constraint_in(
        self,
        package: impl Into<String>,
        name: impl Into<String>,
    ) -> Constraint<Sc> {
        Constraint {
            constraint_ref: ConstraintRef::new(package, name),
            impact_type: self.impact_type,
            weight: self.weight,
            match_weight: self.match_weight,
            stream: self.stream,
        }
    }
}

/// A named, weighted stream ready to be compiled.
#[derive(Debug, Clone)]
pub struct Constraint<Sc: Score> {
    constraint_ref: ConstraintRef,
    impact_type: ImpactType,
    weight: Sc,
    match_weight: MatchWeight,
    stream: Arc<StreamDef>,
}

impl<Sc: Score> Constraint<Sc> {
    pub fn constraint_ref(&self) -> &ConstraintRef {
        &self.constraint_ref
    }

    pub fn impact_type(&self) -> ImpactType {
        self.impact_type
    }

    pub fn weight(&self) -> Sc {
        self.weight
    }

    pub fn match_weight(&self) -> &MatchWeight {
        &self.match_weight
    }

    pub fn stream(&self) -> &Arc<StreamDef> {
        &self.stream
    }

    /// Same constraint with another constraint weight.
    pub fn with_weight(mut self, weight: Sc) -> Self {
        self.weight = weight;
        self
    }
}
