use std::collections::BTreeMap;

use scoreforge_core::Value;

use super::{Accumulator, Extracted, UndoToken};
use crate::error::{ScoreError, ScoreResult};
use crate::eval::EvalContext;

/// Tracks every collected value under its ordering key so the extreme can be
/// retracted without rescanning the group.
///
/// Among values with an equal key the earliest inserted one wins. Inputs whose
/// key is `None` are ignored.
#[derive(Debug)]
pub struct MinMaxAccumulator {
    max: bool,
    next_seq: u64,
    entries: BTreeMap<Value, Vec<(u64, Value)>>,
}

impl MinMaxAccumulator {
    pub fn min() -> Self {
        Self::new(false)
    }

    pub fn max() -> Self {
        Self::new(true)
    }

    fn new(max: bool) -> Self {
        Self {
            max,
            next_seq: 0,
            entries: BTreeMap::new(),
        }
    }
}

impl Accumulator for MinMaxAccumulator {
    fn insert(&mut self, input: Extracted) -> ScoreResult<UndoToken> {
        if input.order.is_null_like() {
            return Ok(UndoToken::Skipped);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries
            .entry(input.order.clone())
            .or_default()
            .push((seq, input.value));
        Ok(UndoToken::Ranked {
            order: input.order,
            seq,
        })
    }

    fn undo(&mut self, token: UndoToken) -> ScoreResult<()> {
        let (order, seq) = match token {
            UndoToken::Skipped => return Ok(()),
            UndoToken::Ranked { order, seq } => (order, seq),
            _ => return Err(ScoreError::InvalidUndo("min/max")),
        };
        let bucket = self
            .entries
            .get_mut(&order)
            .ok_or(ScoreError::InvalidUndo("min/max"))?;
        let pos = bucket
            .iter()
            .position(|(s, _)| *s == seq)
            .ok_or(ScoreError::InvalidUndo("min/max"))?;
        // Buckets stay in insertion order; the head is the tie winner.
        bucket.remove(pos);
        if bucket.is_empty() {
            self.entries.remove(&order);
        }
        Ok(())
    }

    fn result(&self, _ctx: &EvalContext<'_>) -> ScoreResult<Value> {
        let bucket = if self.max {
            self.entries.values().next_back()
        } else {
            self.entries.values().next()
        };
        Ok(bucket
            .and_then(|b| b.first())
            .map(|(_, value)| value.clone())
            .unwrap_or_default())
    }
}
