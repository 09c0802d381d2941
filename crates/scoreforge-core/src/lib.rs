//! ScoreForge Core - shared types for incremental constraint scoring
//!
//! This crate provides the vocabulary the rest of ScoreForge speaks:
//! - Score types for representing solution quality
//! - [`Value`] and [`FactKey`], the data carried by tuples
//! - [`Expr`], the declarative expression language of constraint streams
//! - The [`PlanningFact`] / [`FactSource`] capability interface

pub mod constraint;
pub mod domain;
pub mod expr;
pub mod score;
pub mod value;

pub use constraint::{ConstraintRef, ImpactType};
pub use domain::{FactSource, PlanningFact};
pub use expr::Expr;
pub use score::{
    HardMediumSoftScore, HardSoftDecimalScore, HardSoftScore, ParseableScore, Score,
    ScoreLevel, ScoreParseError, SimpleScore,
};
pub use value::{FactKey, Value, ValueKind};

/// Re-exported so downstream crates name the same decimal type.
pub use rust_decimal::Decimal;
