use indexmap::{IndexMap, IndexSet};

use crate::joiner::JoinKey;
use crate::tuple::TupleId;

/// Hash index from equality-prefix keys to the tuples holding them.
///
/// Buckets keep insertion order so scans are independent of hashing.
#[derive(Debug, Default)]
pub(crate) struct TupleIndex {
    buckets: IndexMap<JoinKey, IndexSet<TupleId>>,
}

impl TupleIndex {
    pub fn insert(&mut self, key: JoinKey, tuple: TupleId) {
        self.buckets.entry(key).or_default().insert(tuple);
    }

    pub fn remove(&mut self, key: &JoinKey, tuple: TupleId) {
        if let Some(bucket) = self.buckets.get_mut(key) {
            bucket.shift_remove(&tuple);
            if bucket.is_empty() {
                self.buckets.shift_remove(key);
            }
        }
    }

    /// Tuples under `key`, in insertion order.
    pub fn get(&self, key: &JoinKey) -> Vec<TupleId> {
        self.buckets
            .get(key)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.buckets.values().map(IndexSet::len).sum()
    }
}
