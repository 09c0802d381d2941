//! Core Score trait definition

use std::fmt::{Debug, Display};
use std::ops::{Add, Neg, Sub};

use rust_decimal::Decimal;

use super::ScoreLevel;

/// Core trait for all score types.
///
/// Scores are compared level by level, highest priority first. The scoring
/// engine only ever builds them through [`Score::multiply_long`],
/// [`Score::multiply_decimal`] and [`Score::checked_add`], which yield `None`
/// instead of wrapping when a level does not fit.
pub trait Score:
    Copy
    + Debug
    + Display
    + Default
    + Send
    + Sync
    + PartialEq
    + Eq
    + PartialOrd
    + Ord
    + std::hash::Hash
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    /// Returns true if this score represents a feasible solution.
    ///
    /// A solution is feasible when all hard constraints are satisfied
    /// (i.e., the hard score is >= 0).
    fn is_feasible(&self) -> bool;

    /// Returns the zero score (identity element for addition).
    fn zero() -> Self;

    /// Returns the number of score levels.
    fn levels_count() -> usize;

    /// Returns the score values as a vector of i64, highest priority first.
    fn to_level_numbers(&self) -> Vec<i64>;

    /// Returns the semantic label for the score level at the given index.
    fn level_label(index: usize) -> Option<ScoreLevel>;

    /// Short type name used in diagnostics.
    fn type_name() -> &'static str;

    /// Multiplies every level by an integer match weight.
    ///
    /// Returns `None` when any level overflows.
    fn multiply_long(&self, multiplicand: i64) -> Option<Self>;

    /// Multiplies every level by a decimal match weight.
    ///
    /// Integral score types return `None`; see [`Score::supports_decimal_weights`].
    fn multiply_decimal(&self, _multiplicand: Decimal) -> Option<Self> {
        None
    }

    /// Whether [`Score::multiply_decimal`] is meaningful for this type.
    fn supports_decimal_weights() -> bool {
        false
    }

    /// Level-wise addition; `None` when any level overflows.
    fn checked_add(&self, other: &Self) -> Option<Self>;

    /// Level-wise subtraction; `None` when any level overflows.
    fn checked_sub(&self, other: &Self) -> Option<Self>;

    /// Returns the absolute value of this score.
    fn abs(&self) -> Self;

    /// Returns true if every level is zero.
    fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Renders only the non-zero levels, e.g. `-2hard` instead of `-2hard/0soft`.
    fn to_short_string(&self) -> String {
        let full = self.to_string();
        let parts: Vec<&str> = full
            .split('/')
            .filter(|part| {
                let numeric: String = part
                    .chars()
                    .take_while(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
                    .collect();
                numeric.parse::<f64>().map(|v| v != 0.0).unwrap_or(true)
            })
            .collect();
        if parts.is_empty() {
            "0".to_string()
        } else {
            parts.join("/")
        }
    }
}

/// Scores that can be parsed from their display form.
pub trait ParseableScore: Score {
    /// Parses a score from a string representation.
    ///
    /// # Format
    /// - SimpleScore: "42"
    /// - HardSoftScore: "0hard/-100soft"
    /// - HardMediumSoftScore: "0hard/0medium/-100soft"
    /// - HardSoftDecimalScore: "0hard/-1.5soft"
    fn parse(s: &str) -> Result<Self, ScoreParseError>;

    /// Returns the string representation of this score.
    fn to_string_repr(&self) -> String {
        self.to_string()
    }
}

/// Error when parsing a score from string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("score parse error: {message}")]
pub struct ScoreParseError {
    pub message: String,
}

impl ScoreParseError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
