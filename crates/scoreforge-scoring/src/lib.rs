//! Incremental constraint scoring for ScoreForge.
//!
//! This crate compiles declarative constraint streams into a shared node
//! network and keeps a score up to date as facts change:
//! - Stream construction (`ConstraintFactory`, `Stream<N>`, `Joiner`, `Collector`)
//! - Node network compilation with structural sharing (`NodeNetwork`)
//! - Incremental sessions (`ConstraintSession`) and the notification-driven
//!   `ScoreDirector`
//! - Score analysis: constraint matches, indictments, explanations and
//!   corruption reports
//!
//! # Architecture
//!
//! Tuples live in a generational arena owned by each session. Nodes exchange
//! tuple handles, keep their bookkeeping in per-edge slots on the tuples they
//! consume, and flush layer by layer. Score contributions are plain undo
//! records held by the terminal nodes.

// Core modules
pub mod analysis;
pub mod collector;
pub mod director;
pub mod error;
pub mod eval;
pub mod facts;
pub mod function;
pub mod graph;
pub mod impact;
pub mod joiner;
pub mod session;
pub mod stream;
pub mod tuple;
pub mod weight_overrides;

pub(crate) mod node;

// ============================================================================
// Errors
// ============================================================================

pub use error::{BuildError, BuildResult, ScoreError, ScoreResult};

// ============================================================================
// Stream API
// ============================================================================

pub use collector::Collector;
pub use joiner::{Joiner, JoinerType};
pub use stream::document::{compile_document, ConstraintDocument};
pub use stream::{
    BiStream, Constraint, ConstraintBuilder, ConstraintFactory, MatchWeight, QuadStream, Stream,
    TriStream, UniStream,
};

// ============================================================================
// Runtime
// ============================================================================

pub use director::{FactSource, Notification, PlanningFact, ScoreDirector};
pub use function::FunctionRegistry;
pub use graph::NodeNetwork;
pub use impact::{ImpactKind, ScoreInliner, UndoScoreImpact, WeightedScoreImpacter};
pub use session::{ConstraintSession, ConstraintSessionFactory};
pub use weight_overrides::{ConstraintWeightOverrides, WeightProvider};

// ============================================================================
// Analysis
// ============================================================================

pub use analysis::{
    ConstraintMatch, ConstraintMatchTotal, ConstraintSummary, Indictment, IndictmentMap,
    ScoreCorruption, ScoreExplanation,
};
