// Sum and average accumulators.
//
// Arithmetic is kind-strict: summing an int into a long sum is a type error.

use rust_decimal::Decimal;
use scoreforge_core::Value;

use super::{Accumulator, Extracted, UndoToken};
use crate::error::{ScoreError, ScoreResult};
use crate::eval::ops::{arithmetic, Op};
use crate::eval::EvalContext;

#[derive(Debug, Default)]
struct RunningSum {
    sum: Value,
    count: usize,
    /// Float summands in `total_cmp` order. Float sums are recomputed from
    /// these instead of subtracting on undo, so the result does not depend on
    /// the order of inserts and retracts.
    floats: Vec<f64>,
}

impl RunningSum {
    fn add(&mut self, value: Value) -> ScoreResult<UndoToken> {
        if value.is_none() {
            return Ok(UndoToken::Skipped);
        }
        if self.count > 0 && self.sum.kind() != value.kind() {
            return Err(ScoreError::TypeMismatch {
                context: "sum",
                expected: self.sum.kind().name(),
                actual: value.kind(),
            });
        }
        self.sum = match &value {
            Value::Float(f) => {
                let at = self.floats.partition_point(|x| x.total_cmp(f).is_lt());
                self.floats.insert(at, *f);
                self.float_sum()
            }
            _ if self.count == 0 => value.clone(),
            _ => arithmetic(Op::Add, std::mem::take(&mut self.sum), value.clone())?,
        };
        self.count += 1;
        Ok(UndoToken::Value(value))
    }

    fn remove(&mut self, token: UndoToken, name: &'static str) -> ScoreResult<()> {
        match token {
            UndoToken::Skipped => Ok(()),
            UndoToken::Value(Value::Float(f)) if self.count > 0 => {
                let at = self
                    .floats
                    .binary_search_by(|x| x.total_cmp(&f))
                    .map_err(|_| ScoreError::InvalidUndo(name))?;
                self.floats.remove(at);
                self.count -= 1;
                self.sum = if self.count == 0 {
                    Value::None
                } else {
                    self.float_sum()
                };
                Ok(())
            }
            UndoToken::Value(value) if self.count > 0 => {
                self.count -= 1;
                self.sum = if self.count == 0 {
                    Value::None
                } else {
                    arithmetic(Op::Sub, std::mem::take(&mut self.sum), value)?
                };
                Ok(())
            }
            _ => Err(ScoreError::InvalidUndo(name)),
        }
    }

    fn float_sum(&self) -> Value {
        Value::Float(self.floats.iter().sum())
    }
}

#[derive(Debug, Default)]
pub struct SumAccumulator {
    running: RunningSum,
}

impl Accumulator for SumAccumulator {
    fn insert(&mut self, input: Extracted) -> ScoreResult<UndoToken> {
        self.running.add(input.value)
    }

    fn undo(&mut self, token: UndoToken) -> ScoreResult<()> {
        self.running.remove(token, "sum")
    }

    /// The sum, or `Int(0)` when nothing non-null was collected.
    fn result(&self, _ctx: &EvalContext<'_>) -> ScoreResult<Value> {
        if self.running.count == 0 {
            Ok(Value::Int(0))
        } else {
            Ok(self.running.sum.clone())
        }
    }
}

#[derive(Debug, Default)]
pub struct AverageAccumulator {
    running: RunningSum,
}

impl Accumulator for AverageAccumulator {
    fn insert(&mut self, input: Extracted) -> ScoreResult<UndoToken> {
        self.running.add(input.value)
    }

    fn undo(&mut self, token: UndoToken) -> ScoreResult<()> {
        self.running.remove(token, "average")
    }

    /// Decimal inputs average to a decimal, everything else to a float.
    fn result(&self, _ctx: &EvalContext<'_>) -> ScoreResult<Value> {
        let count = self.running.count;
        if count == 0 {
            return Ok(Value::None);
        }
        let average = match &self.running.sum {
            Value::Int(sum) => Value::Float(f64::from(*sum) / count as f64),
            Value::Long(sum) => Value::Float(*sum as f64 / count as f64),
            Value::Float(sum) => Value::Float(sum / count as f64),
            Value::Decimal(sum) => sum
                .checked_div(Decimal::from(count))
                .map(Value::Decimal)
                .ok_or_else(|| ScoreError::Arithmetic(format!("average of {} overflows", sum)))?,
            other => {
                return Err(ScoreError::TypeMismatch {
                    context: "average",
                    expected: "numeric",
                    actual: other.kind(),
                })
            }
        };
        Ok(average)
    }
}

