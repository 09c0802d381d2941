//! HardSoftDecimalScore - Two-level score with i64 precision and ×100000 scaling
//!
//! Internal values are scaled by 100000 to provide 5 decimal places of
//! precision without heap allocation. This is the only built-in score type
//! that accepts decimal match weights.

use std::cmp::Ordering;
use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::traits::{ParseableScore, Score, ScoreParseError};
use super::ScoreLevel;

/// Scale factor for 5 decimal places of precision.
const SCALE: i64 = 100_000;
const SCALE_DIGITS: u32 = 5;

/// A hard/soft score whose levels carry five decimal places.
///
/// # Examples
///
/// ```
/// use scoreforge_core::{HardSoftDecimalScore, Score};
///
/// let score = HardSoftDecimalScore::of(-1, -100);
/// assert_eq!(score.hard_scaled(), -100000);
///
/// let fractional = HardSoftDecimalScore::of_scaled(-150000, -250000);
/// assert_eq!(format!("{}", fractional), "-1.5hard/-2.5soft");
/// assert!(!fractional.is_feasible());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HardSoftDecimalScore {
    hard: i64,
    soft: i64,
}

impl HardSoftDecimalScore {
    pub const ZERO: HardSoftDecimalScore = HardSoftDecimalScore { hard: 0, soft: 0 };

    pub const ONE_HARD: HardSoftDecimalScore = HardSoftDecimalScore {
        hard: SCALE,
        soft: 0,
    };

    pub const ONE_SOFT: HardSoftDecimalScore = HardSoftDecimalScore {
        hard: 0,
        soft: SCALE,
    };

    /// Creates a new score from unscaled values.
    #[inline]
    pub const fn of(hard: i64, soft: i64) -> Self {
        HardSoftDecimalScore {
            hard: hard * SCALE,
            soft: soft * SCALE,
        }
    }

    /// Creates a new score from pre-scaled values.
    #[inline]
    pub const fn of_scaled(hard: i64, soft: i64) -> Self {
        HardSoftDecimalScore { hard, soft }
    }

    /// Creates a score from decimal levels, rounding to five places.
    ///
    /// Returns `None` if either level does not fit the scaled representation.
    pub fn of_decimal(hard: Decimal, soft: Decimal) -> Option<Self> {
        Some(HardSoftDecimalScore {
            hard: to_scaled(hard)?,
            soft: to_scaled(soft)?,
        })
    }

    #[inline]
    pub const fn hard_scaled(&self) -> i64 {
        self.hard
    }

    #[inline]
    pub const fn soft_scaled(&self) -> i64 {
        self.soft
    }

    pub fn hard(&self) -> Decimal {
        Decimal::new(self.hard, SCALE_DIGITS).normalize()
    }

    pub fn soft(&self) -> Decimal {
        Decimal::new(self.soft, SCALE_DIGITS).normalize()
    }
}

fn to_scaled(value: Decimal) -> Option<i64> {
    value
        .checked_mul(Decimal::from(SCALE))?
        .round()
        .to_i64()
}

fn scale_level(scaled: i64, multiplicand: Decimal) -> Option<i64> {
    Decimal::from(scaled)
        .checked_mul(multiplicand)?
        .round()
        .to_i64()
}

impl Score for HardSoftDecimalScore {
    #[inline]
    fn is_feasible(&self) -> bool {
        self.hard >= 0
    }

    #[inline]
    fn zero() -> Self {
        HardSoftDecimalScore::ZERO
    }

    #[inline]
    fn levels_count() -> usize {
        2
    }

    fn to_level_numbers(&self) -> Vec<i64> {
        vec![self.hard, self.soft]
    }

    fn level_label(index: usize) -> Option<ScoreLevel> {
        match index {
            0 => Some(ScoreLevel::Hard),
            1 => Some(ScoreLevel::Soft),
            _ => None,
        }
    }

    fn type_name() -> &'static str {
        "HardSoftDecimalScore"
    }

    impl_score_scale!(HardSoftDecimalScore { hard, soft } => of_scaled);

    fn multiply_decimal(&self, multiplicand: Decimal) -> Option<Self> {
        Some(HardSoftDecimalScore::of_scaled(
            scale_level(self.hard, multiplicand)?,
            scale_level(self.soft, multiplicand)?,
        ))
    }

    fn supports_decimal_weights() -> bool {
        true
    }
}

impl Ord for HardSoftDecimalScore {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.hard.cmp(&other.hard) {
            Ordering::Equal => self.soft.cmp(&other.soft),
            other => other,
        }
    }
}

impl_score_ops!(HardSoftDecimalScore { hard, soft } => of_scaled);

impl fmt::Debug for HardSoftDecimalScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HardSoftDecimalScore({}, {})", self.hard(), self.soft())
    }
}

impl fmt::Display for HardSoftDecimalScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}hard/{}soft", self.hard(), self.soft())
    }
}

impl ParseableScore for HardSoftDecimalScore {
    fn parse(s: &str) -> Result<Self, ScoreParseError> {
        let s = s.trim();
        let (hard_part, soft_part) = s.split_once('/').ok_or_else(|| {
            ScoreParseError::new(format!(
                "invalid HardSoftDecimalScore '{}': expected 'Xhard/Ysoft'",
                s
            ))
        })?;
        let hard = parse_level(hard_part, "hard")?;
        let soft = parse_level(soft_part, "soft")?;
        HardSoftDecimalScore::of_decimal(hard, soft).ok_or_else(|| {
            ScoreParseError::new(format!("HardSoftDecimalScore '{}' is out of range", s))
        })
    }
}

fn parse_level(part: &str, suffix: &str) -> Result<Decimal, ScoreParseError> {
    let part = part.trim();
    let number = part.strip_suffix(suffix).ok_or_else(|| {
        ScoreParseError::new(format!("{} part '{}' must end with '{}'", suffix, part, suffix))
    })?;
    number
        .parse::<Decimal>()
        .map_err(|e| ScoreParseError::new(format!("invalid {} score '{}': {}", suffix, number, e)))
}
