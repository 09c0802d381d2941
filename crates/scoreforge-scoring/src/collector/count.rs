// Counting accumulators.

use std::collections::HashMap;

use scoreforge_core::Value;

use super::{Accumulator, Extracted, UndoToken};
use crate::error::{ScoreError, ScoreResult};
use crate::eval::EvalContext;

fn to_int(count: usize) -> ScoreResult<Value> {
    i32::try_from(count)
        .map(Value::Int)
        .map_err(|_| ScoreError::Arithmetic(format!("count {} does not fit an int", count)))
}

#[derive(Debug, Default)]
pub struct CountAccumulator {
    count: usize,
}

impl Accumulator for CountAccumulator {
    fn insert(&mut self, _input: Extracted) -> ScoreResult<UndoToken> {
        self.count += 1;
        Ok(UndoToken::Count)
    }

    fn undo(&mut self, token: UndoToken) -> ScoreResult<()> {
        match token {
            UndoToken::Count if self.count > 0 => {
                self.count -= 1;
                Ok(())
            }
            _ => Err(ScoreError::InvalidUndo("count")),
        }
    }

    fn result(&self, _ctx: &EvalContext<'_>) -> ScoreResult<Value> {
        to_int(self.count)
    }
}

// Reference-counts each distinct value so duplicates retract cleanly.
#[derive(Debug, Default)]
pub struct CountDistinctAccumulator {
    counts: HashMap<Value, usize>,
}

impl Accumulator for CountDistinctAccumulator {
    fn insert(&mut self, input: Extracted) -> ScoreResult<UndoToken> {
        *self.counts.entry(input.value.clone()).or_insert(0) += 1;
        Ok(UndoToken::Value(input.value))
    }

    fn undo(&mut self, token: UndoToken) -> ScoreResult<()> {
        let UndoToken::Value(value) = token else {
            return Err(ScoreError::InvalidUndo("count-distinct"));
        };
        match self.counts.get_mut(&value) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                self.counts.remove(&value);
            }
            None => return Err(ScoreError::InvalidUndo("count-distinct")),
        }
        Ok(())
    }

    fn result(&self, _ctx: &EvalContext<'_>) -> ScoreResult<Value> {
        to_int(self.counts.len())
    }
}
