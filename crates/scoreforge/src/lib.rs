//! ScoreForge - Incremental Constraint Scoring in Rust
//!
//! Declare constraints as streams over your facts, compile them once, and
//! let a session keep the score current as facts change.
//!
//! # Example
//!
//! ```rust
//! use scoreforge::prelude::*;
//!
//! let factory = ConstraintFactory::new("example");
//! let negative = factory
//!     .for_each(0)
//!     .filter(Expr::lt(Expr::field(0, 0), Expr::int(0)))
//!     .penalize(HardSoftScore::ONE_HARD)
//!     .as_constraint("negative");
//!
//! let sessions = ConstraintSessionFactory::new(vec![negative], FunctionRegistry::new())?;
//! let mut session = sessions.create_session();
//! session.insert(FactKey::new(0, 1), vec![Value::Int(-4)])?;
//! assert_eq!(session.calculate_score()?, HardSoftScore::of(-1, 0));
//! # Ok::<(), ScoreForgeError>(())
//! ```

mod error;
mod scoring;

pub use error::ScoreForgeError;
pub use scoring::{load_constraints, score_solution};

// Score types
pub use scoreforge_core::score::{
    HardMediumSoftScore, HardSoftDecimalScore, HardSoftScore, ParseableScore, Score, SimpleScore,
};

// Fact and expression model
pub use scoreforge_core::{
    ConstraintRef, Decimal, Expr, FactKey, FactSource, ImpactType, PlanningFact, Value, ValueKind,
};

// Constraint stream API
pub use scoreforge_scoring::{collector, joiner, stream};

// Sessions and directors
pub use scoreforge_scoring::{
    ConstraintSession, ConstraintSessionFactory, ConstraintWeightOverrides, FunctionRegistry,
    ScoreDirector,
};

// Analysis
pub use scoreforge_scoring::analysis;

// Configuration
pub use scoreforge_config::{DirectorConfig, EnvironmentMode};

pub mod prelude {
    pub use super::{
        HardMediumSoftScore, HardSoftDecimalScore, HardSoftScore, Score, SimpleScore,
    };
    pub use super::{Expr, FactKey, FactSource, PlanningFact, Value};
    pub use super::stream::{ConstraintFactory, Stream};
    pub use super::{collector, joiner};
    pub use super::{ConstraintSessionFactory, FunctionRegistry, ScoreDirector};
    pub use super::ScoreForgeError;
}
