//! Joiners: value-comparable matching conditions between two tuples.
//!
//! A [`Joiner`] is an ordered list of predicates. Left-side expressions are
//! evaluated over the left tuple, right-side expressions over the right tuple,
//! each with its own `Param(0)`. The leading run of equality predicates is
//! turned into a hash index key at build time; the rest is checked per pair.
//!
//! ```
//! use scoreforge_core::Expr;
//! use scoreforge_scoring::joiner::{equal, less_than};
//!
//! // Same computer, and the left process starts before the right one.
//! let joiner = equal(Expr::field(0, 0)).and(less_than(Expr::field(0, 1), Expr::field(0, 1)));
//! assert_eq!(joiner.equal_prefix_len(), 1);
//! ```


use std::cmp::Ordering;

use scoreforge_core::{Expr, Value};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::ScoreResult;
use crate::eval::{compare_values, EvalContext};

/// Composite index key built from the equality prefix of a joiner.
pub type JoinKey = SmallVec<[Value; 2]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinerType {
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Overlapping,
}

impl JoinerType {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            JoinerType::Equal => ordering == Ordering::Equal,
            JoinerType::LessThan => ordering == Ordering::Less,
            JoinerType::LessThanOrEqual => ordering != Ordering::Greater,
            JoinerType::GreaterThan => ordering == Ordering::Greater,
            JoinerType::GreaterThanOrEqual => ordering != Ordering::Less,
            JoinerType::Overlapping => false,
        }
    }
}

/// One predicate of a joiner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JoinerPart {
    /// `left <op> right`.
    Compare {
        joiner_type: JoinerType,
        left: Expr,
        right: Expr,
    },
    /// Half-open intervals `[left_start, left_end)` and
    /// `[right_start, right_end)` share at least one point.
    Overlapping {
        left_start: Expr,
        left_end: Expr,
        right_start: Expr,
        right_end: Expr,
    },
    /// Arbitrary predicate over the concatenated `left ++ right` tuple.
    Filtering { predicate: Expr },
}

impl JoinerPart {
    pub fn joiner_type(&self) -> Option<JoinerType> {
        match self {
            JoinerPart::Compare { joiner_type, .. } => Some(*joiner_type),
            JoinerPart::Overlapping { .. } => Some(JoinerType::Overlapping),
            JoinerPart::Filtering { .. } => None,
        }
    }

    fn is_equal(&self) -> bool {
        self.joiner_type() == Some(JoinerType::Equal)
    }
}

/// Conjunction of [`JoinerPart`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Joiner {
    parts: Vec<JoinerPart>,
}

/// Matches every pair.
pub fn none() -> Joiner {
    Joiner::default()
}

/// `mapping(left) == mapping(right)`. Null values are equal to each other.
pub fn equal(mapping: Expr) -> Joiner {
    equal_bi(mapping.clone(), mapping)
}

pub fn equal_bi(left: Expr, right: Expr) -> Joiner {
    compare(JoinerType::Equal, left, right)
}

pub fn less_than(left: Expr, right: Expr) -> Joiner {
    compare(JoinerType::LessThan, left, right)
}

pub fn less_than_or_equal(left: Expr, right: Expr) -> Joiner {
    compare(JoinerType::LessThanOrEqual, left, right)
}

pub fn greater_than(left: Expr, right: Expr) -> Joiner {
    compare(JoinerType::GreaterThan, left, right)
}

pub fn greater_than_or_equal(left: Expr, right: Expr) -> Joiner {
    compare(JoinerType::GreaterThanOrEqual, left, right)
}

/// Interval overlap. Pairs with a null-like bound never match.
pub fn overlapping(left_start: Expr, left_end: Expr, right_start: Expr, right_end: Expr) -> Joiner {
    Joiner::from(JoinerPart::Overlapping {
        left_start,
        left_end,
        right_start,
        right_end,
    })
}

/// Predicate over the joined tuple; the right tuple's elements follow the
/// left tuple's.
pub fn filtering(predicate: Expr) -> Joiner {
    Joiner::from(JoinerPart::Filtering { predicate })
}

fn compare(joiner_type: JoinerType, left: Expr, right: Expr) -> Joiner {
    Joiner::from(JoinerPart::Compare {
        joiner_type,
        left,
        right,
    })
}

impl From<JoinerPart> for Joiner {
    fn from(part: JoinerPart) -> Self {
        Self { parts: vec![part] }
    }
}

impl Joiner {
    pub fn new(parts: Vec<JoinerPart>) -> Self {
        Self { parts }
    }

    /// Appends `other`'s predicates after this joiner's.
    pub fn and(mut self, other: Joiner) -> Joiner {
        self.parts.extend(other.parts);
        self
    }

    pub fn parts(&self) -> &[JoinerPart] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Number of leading equality predicates used as the index key.
    pub fn equal_prefix_len(&self) -> usize {
        self.parts.iter().take_while(|p| p.is_equal()).count()
    }

    fn prefix(&self) -> impl Iterator<Item = (&Expr, &Expr)> {
        self.parts.iter().map_while(|part| match part {
            JoinerPart::Compare {
                joiner_type: JoinerType::Equal,
                left,
                right,
            } => Some((left, right)),
            _ => None,
        })
    }

    fn remainder(&self) -> &[JoinerPart] {
        &self.parts[self.equal_prefix_len()..]
    }

    pub fn left_key(&self, ctx: &EvalContext<'_>, left: &[Value]) -> ScoreResult<JoinKey> {
        self.prefix().map(|(l, _)| ctx.eval(l, left)).collect()
    }

    pub fn right_key(&self, ctx: &EvalContext<'_>, right: &[Value]) -> ScoreResult<JoinKey> {
        self.prefix().map(|(_, r)| ctx.eval(r, right)).collect()
    }

    /// Tests the non-indexed predicates. The equality prefix is assumed to
    /// hold already.
    pub fn matches_remainder(
        &self,
        ctx: &EvalContext<'_>,
        left: &[Value],
        right: &[Value],
    ) -> ScoreResult<bool> {
        for part in self.remainder() {
            if !part_matches(part, ctx, left, right)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Tests every predicate, without going through an index.
    pub fn matches(
        &self,
        ctx: &EvalContext<'_>,
        left: &[Value],
        right: &[Value],
    ) -> ScoreResult<bool> {
        if self.left_key(ctx, left)? != self.right_key(ctx, right)? {
            return Ok(false);
        }
        self.matches_remainder(ctx, left, right)
    }

    /// Expressions read from the left tuple.
    pub(crate) fn left_exprs(&self) -> Vec<&Expr> {
        let mut exprs = Vec::new();
        for part in &self.parts {
            match part {
                JoinerPart::Compare { left, .. } => exprs.push(left),
                JoinerPart::Overlapping {
                    left_start,
                    left_end,
                    ..
                } => exprs.extend([left_start, left_end]),
                JoinerPart::Filtering { .. } => {}
            }
        }
        exprs
    }

    /// Expressions read from the right tuple.
    pub(crate) fn right_exprs(&self) -> Vec<&Expr> {
        let mut exprs = Vec::new();
        for part in &self.parts {
            match part {
                JoinerPart::Compare { right, .. } => exprs.push(right),
                JoinerPart::Overlapping {
                    right_start,
                    right_end,
                    ..
                } => exprs.extend([right_start, right_end]),
                JoinerPart::Filtering { .. } => {}
            }
        }
        exprs
    }

    /// Expressions read from the concatenated tuple.
    pub(crate) fn joined_exprs(&self) -> Vec<&Expr> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                JoinerPart::Filtering { predicate } => Some(predicate),
                _ => None,
            })
            .collect()
    }
}

fn part_matches(
    part: &JoinerPart,
    ctx: &EvalContext<'_>,
    left: &[Value],
    right: &[Value],
) -> ScoreResult<bool> {
    match part {
        JoinerPart::Compare {
            joiner_type: JoinerType::Equal,
            left: l,
            right: r,
        } => Ok(ctx.eval(l, left)? == ctx.eval(r, right)?),
        JoinerPart::Compare {
            joiner_type,
            left: l,
            right: r,
        } => {
            let ordering = compare_values(&ctx.eval(l, left)?, &ctx.eval(r, right)?)?;
            Ok(ordering.is_some_and(|o| joiner_type.accepts(o)))
        }
        JoinerPart::Overlapping {
            left_start,
            left_end,
            right_start,
            right_end,
        } => {
            let ls = ctx.eval(left_start, left)?;
            let le = ctx.eval(left_end, left)?;
            let rs = ctx.eval(right_start, right)?;
            let re = ctx.eval(right_end, right)?;
            let starts_before_end = compare_values(&ls, &re)?;
            let ends_after_start = compare_values(&rs, &le)?;
            Ok(starts_before_end == Some(Ordering::Less)
                && ends_after_start == Some(Ordering::Less))
        }
        JoinerPart::Filtering { predicate } => {
            let joined: Vec<Value> = left.iter().chain(right).cloned().collect();
            ctx.test(predicate, &joined)
        }
    }
}
