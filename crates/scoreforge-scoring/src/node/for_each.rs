use std::collections::HashMap;

use scoreforge_core::{FactKey, Score};

use super::root_values;
use crate::error::{ScoreError, ScoreResult};
use crate::graph::NodeId;
use crate::tuple::{TupleArena, TupleId};

/// Root node: one tuple per fact of its class.
#[derive(Debug)]
pub(crate) struct ForEachNode {
    id: NodeId,
    tuples: HashMap<FactKey, TupleId>,
}

impl ForEachNode {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            tuples: HashMap::new(),
        }
    }

    pub fn insert_fact<Sc: Score>(
        &mut self,
        arena: &mut TupleArena<Sc>,
        queue: &mut Vec<TupleId>,
        key: FactKey,
        slot_count: usize,
    ) -> ScoreResult<()> {
        if self.tuples.contains_key(&key) {
            return Err(ScoreError::DuplicateFact(key));
        }
        let id = arena.create(self.id, root_values(key), slot_count);
        queue.push(id);
        self.tuples.insert(key, id);
        Ok(())
    }

    pub fn update_fact<Sc: Score>(
        &mut self,
        arena: &mut TupleArena<Sc>,
        queue: &mut Vec<TupleId>,
        key: FactKey,
    ) -> ScoreResult<()> {
        let id = *self.tuples.get(&key).ok_or(ScoreError::UnknownFact(key))?;
        if arena.mark_updating(id)? {
            queue.push(id);
        }
        Ok(())
    }

    pub fn retract_fact<Sc: Score>(
        &mut self,
        arena: &mut TupleArena<Sc>,
        queue: &mut Vec<TupleId>,
        key: FactKey,
    ) -> ScoreResult<()> {
        let id = self.tuples.remove(&key).ok_or(ScoreError::UnknownFact(key))?;
        if arena.mark_retracting(id)? {
            queue.push(id);
        }
        Ok(())
    }

    pub fn tuple(&self, key: FactKey) -> Option<TupleId> {
        self.tuples.get(&key).copied()
    }
}
