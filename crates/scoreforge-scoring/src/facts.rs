//! Field snapshots of the facts known to a session.

use std::collections::HashMap;

use scoreforge_core::{FactKey, Value};

use crate::error::{ScoreError, ScoreResult};

/// Live facts plus facts retracted since the last flush.
///
/// Retracted snapshots stay readable until the pending flush completes, so
/// join partners processed earlier in the same flush can still evaluate
/// predicates against them.
#[derive(Debug, Default)]
pub struct FactStore {
    live: HashMap<FactKey, Vec<Value>>,
    retired: HashMap<FactKey, Vec<Value>>,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: FactKey, fields: Vec<Value>) -> ScoreResult<()> {
        if self.live.contains_key(&key) {
            return Err(ScoreError::DuplicateFact(key));
        }
        self.live.insert(key, fields);
        Ok(())
    }

    pub fn update(&mut self, key: FactKey, fields: Vec<Value>) -> ScoreResult<()> {
        let slot = self.live.get_mut(&key).ok_or(ScoreError::UnknownFact(key))?;
        *slot = fields;
        Ok(())
    }

    pub fn retract(&mut self, key: FactKey) -> ScoreResult<()> {
        let fields = self.live.remove(&key).ok_or(ScoreError::UnknownFact(key))?;
        self.retired.insert(key, fields);
        Ok(())
    }

    pub fn contains(&self, key: FactKey) -> bool {
        self.live.contains_key(&key)
    }

    pub fn get(&self, key: FactKey) -> Option<&[Value]> {
        self.live
            .get(&key)
            .or_else(|| self.retired.get(&key))
            .map(Vec::as_slice)
    }

    /// Reads one field of a fact.
    pub fn field(&self, key: FactKey, field: usize) -> ScoreResult<Value> {
        let fields = self.get(key).ok_or(ScoreError::UnknownFact(key))?;
        fields
            .get(field)
            .cloned()
            .ok_or(ScoreError::FieldOutOfRange { fact: key, field })
    }

    /// Forgets retracted snapshots once a flush has completed.
    pub fn clear_retired(&mut self) {
        self.retired.clear();
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
