use std::collections::BTreeMap;

use scoreforge_core::{Expr, Value};

use super::{Accumulator, Extracted, UndoToken};
use crate::error::{ScoreError, ScoreResult};
use crate::eval::EvalContext;

/// Collects values into a list in insertion order.
#[derive(Debug, Default)]
pub struct ToListAccumulator {
    next_seq: u64,
    items: BTreeMap<u64, Value>,
}

impl Accumulator for ToListAccumulator {
    fn insert(&mut self, input: Extracted) -> ScoreResult<UndoToken> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.insert(seq, input.value);
        Ok(UndoToken::Seq(seq))
    }

    fn undo(&mut self, token: UndoToken) -> ScoreResult<()> {
        match token {
            UndoToken::Seq(seq) => self
                .items
                .remove(&seq)
                .map(|_| ())
                .ok_or(ScoreError::InvalidUndo("to-list")),
            _ => Err(ScoreError::InvalidUndo("to-list")),
        }
    }

    fn result(&self, _ctx: &EvalContext<'_>) -> ScoreResult<Value> {
        Ok(Value::List(self.items.values().cloned().collect()))
    }
}

/// Post-processes the result of another accumulator.
#[derive(Debug)]
pub struct AndThenAccumulator {
    inner: Box<dyn Accumulator>,
    mapping: Expr,
}

impl AndThenAccumulator {
    pub fn new(inner: Box<dyn Accumulator>, mapping: Expr) -> Self {
        Self { inner, mapping }
    }
}

impl Accumulator for AndThenAccumulator {
    fn insert(&mut self, input: Extracted) -> ScoreResult<UndoToken> {
        self.inner.insert(input)
    }

    fn undo(&mut self, token: UndoToken) -> ScoreResult<()> {
        self.inner.undo(token)
    }

    fn result(&self, ctx: &EvalContext<'_>) -> ScoreResult<Value> {
        let inner = self.inner.result(ctx)?;
        ctx.eval(&self.mapping, &[inner])
    }
}
