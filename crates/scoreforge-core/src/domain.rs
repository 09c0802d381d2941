//! Capability interface between a user's domain model and the engine.
//!
//! The engine never inspects user types. A fact exposes its identity and a
//! snapshot of its field values, and a solution enumerates and looks up its
//! facts by key.

use crate::value::{FactKey, Value};

/// A planning entity or problem fact as seen by the scoring engine.
pub trait PlanningFact {
    /// Identity of this fact within its solution.
    fn fact_key(&self) -> FactKey;

    /// Number of fields exposed to constraint expressions.
    fn field_count(&self) -> usize;

    /// Value of field `idx`; out-of-range indices yield `Value::None`.
    fn field(&self, idx: usize) -> Value;

    /// Snapshot of every field, in field order.
    fn field_values(&self) -> Vec<Value> {
        (0..self.field_count()).map(|idx| self.field(idx)).collect()
    }
}

/// A solution the engine can seed a session from and re-read facts through.
pub trait FactSource {
    /// Visits every fact in a deterministic order.
    fn visit_facts(&self, visitor: &mut dyn FnMut(&dyn PlanningFact));

    /// Looks up a single fact by key.
    fn fact(&self, key: FactKey) -> Option<&dyn PlanningFact>;

    /// Total number of facts.
    fn fact_count(&self) -> usize {
        let mut count = 0;
        self.visit_facts(&mut |_| count += 1);
        count
    }
}
