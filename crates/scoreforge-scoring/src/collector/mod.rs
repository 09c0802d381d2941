//! Collectors for grouping and aggregating tuples.
//!
//! A [`Collector`] is a value-comparable description of an aggregation. At
//! runtime each group gets one [`Accumulator`] per collector. Inserting into an
//! accumulator returns an [`UndoToken`], and handing that token back removes
//! exactly that contribution, so groups never recompute from scratch.

mod count;
mod list;
mod min_max;
mod sum;

#[cfg(test)]
mod tests;

use std::fmt;

use scoreforge_core::{Expr, Value};
use serde::{Deserialize, Serialize};

use crate::error::ScoreResult;
use crate::eval::EvalContext;

pub use count::{CountAccumulator, CountDistinctAccumulator};
pub use list::{AndThenAccumulator, ToListAccumulator};
pub use min_max::MinMaxAccumulator;
pub use sum::{AverageAccumulator, SumAccumulator};

/// Aggregation descriptor used by `group_by`.
///
/// Mapper expressions are evaluated over the incoming tuple. `property` and
/// the `AndThen` mapping are evaluated over a single value, so they may only
/// read `Param(0)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collector {
    Count,
    CountDistinct(Expr),
    Sum(Expr),
    Average(Expr),
    Min {
        mapper: Expr,
        #[serde(default)]
        property: Option<Expr>,
    },
    Max {
        mapper: Expr,
        #[serde(default)]
        property: Option<Expr>,
    },
    ToList(Expr),
    /// Applies `mapping` to the inner result; nothing is re-accumulated.
    AndThen(Box<Collector>, Expr),
}

/// Counts tuples.
pub fn count() -> Collector {
    Collector::Count
}

/// Counts distinct mapped values.
pub fn count_distinct(mapper: Expr) -> Collector {
    Collector::CountDistinct(mapper)
}

/// Sums mapped values. `None` values are skipped.
pub fn sum(mapper: Expr) -> Collector {
    Collector::Sum(mapper)
}

pub fn average(mapper: Expr) -> Collector {
    Collector::Average(mapper)
}

pub fn min(mapper: Expr) -> Collector {
    Collector::Min {
        mapper,
        property: None,
    }
}

pub fn max(mapper: Expr) -> Collector {
    Collector::Max {
        mapper,
        property: None,
    }
}

/// Minimum of mapped values, ordered by `property` (evaluated on the value).
pub fn min_by(mapper: Expr, property: Expr) -> Collector {
    Collector::Min {
        mapper,
        property: Some(property),
    }
}

pub fn max_by(mapper: Expr, property: Expr) -> Collector {
    Collector::Max {
        mapper,
        property: Some(property),
    }
}

pub fn to_list(mapper: Expr) -> Collector {
    Collector::ToList(mapper)
}

/// Which tuple an expression inside a collector is evaluated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExprScope {
    /// The incoming tuple.
    Tuple,
    /// A single collected value at `Param(0)`.
    Element,
}

impl Collector {
    /// Wraps this collector so its result is post-processed by `mapping`.
    pub fn and_then(self, mapping: Expr) -> Collector {
        Collector::AndThen(Box::new(self), mapping)
    }

    /// Creates a fresh, empty accumulator.
    pub fn supplier(&self) -> Box<dyn Accumulator> {
        match self {
            Collector::Count => Box::new(CountAccumulator::default()),
            Collector::CountDistinct(_) => Box::new(CountDistinctAccumulator::default()),
            Collector::Sum(_) => Box::new(SumAccumulator::default()),
            Collector::Average(_) => Box::new(AverageAccumulator::default()),
            Collector::Min { .. } => Box::new(MinMaxAccumulator::min()),
            Collector::Max { .. } => Box::new(MinMaxAccumulator::max()),
            Collector::ToList(_) => Box::new(ToListAccumulator::default()),
            Collector::AndThen(inner, mapping) => {
                Box::new(AndThenAccumulator::new(inner.supplier(), mapping.clone()))
            }
        }
    }

    /// Evaluates the collector's input for one tuple.
    pub fn extract(&self, ctx: &EvalContext<'_>, params: &[Value]) -> ScoreResult<Extracted> {
        match self {
            Collector::Count => Ok(Extracted::plain(Value::None)),
            Collector::CountDistinct(mapper)
            | Collector::Sum(mapper)
            | Collector::Average(mapper)
            | Collector::ToList(mapper) => Ok(Extracted::plain(ctx.eval(mapper, params)?)),
            Collector::Min { mapper, property } | Collector::Max { mapper, property } => {
                let value = ctx.eval(mapper, params)?;
                let order = match property {
                    Some(property) => ctx.eval(property, std::slice::from_ref(&value))?,
                    None => value.clone(),
                };
                Ok(Extracted { value, order })
            }
            Collector::AndThen(inner, _) => inner.extract(ctx, params),
        }
    }

    /// Every expression in this collector with the tuple it reads.
    pub(crate) fn exprs(&self) -> Vec<(&Expr, ExprScope)> {
        match self {
            Collector::Count => Vec::new(),
            Collector::CountDistinct(e)
            | Collector::Sum(e)
            | Collector::Average(e)
            | Collector::ToList(e) => vec![(e, ExprScope::Tuple)],
            Collector::Min { mapper, property } | Collector::Max { mapper, property } => {
                let mut exprs = vec![(mapper, ExprScope::Tuple)];
                exprs.extend(property.iter().map(|p| (p, ExprScope::Element)));
                exprs
            }
            Collector::AndThen(inner, mapping) => {
                let mut exprs = inner.exprs();
                exprs.push((mapping, ExprScope::Element));
                exprs
            }
        }
    }
}

/// A collector input: the collected value and the key it is ordered by.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub value: Value,
    /// Ordering key; only min/max collectors read it.
    pub order: Value,
}

impl Extracted {
    pub fn plain(value: Value) -> Self {
        Self {
            order: Value::None,
            value,
        }
    }
}

/// Plain-data record of one accumulator insertion.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoToken {
    /// The input contributed nothing (e.g. a `None` summand).
    Skipped,
    Count,
    Value(Value),
    Ranked { order: Value, seq: u64 },
    Seq(u64),
}

/// Mutable aggregation state of one group for one collector.
pub trait Accumulator: Send + fmt::Debug {
    /// Adds one input and returns the token that undoes it.
    fn insert(&mut self, input: Extracted) -> ScoreResult<UndoToken>;

    /// Removes the contribution recorded by `token`.
    fn undo(&mut self, token: UndoToken) -> ScoreResult<()>;

    /// Current aggregate.
    fn result(&self, ctx: &EvalContext<'_>) -> ScoreResult<Value>;
}
