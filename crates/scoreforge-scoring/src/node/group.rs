// Group-by: folds input tuples into per-key accumulators.
//
// Inputs only mark their group dirty. Output tuples are created, refreshed or
// retracted once per flush, when the node's layer is reached. Every dirty
// group refreshes its output.

use indexmap::{IndexMap, IndexSet};
use scoreforge_core::{Expr, Score};
use smallvec::SmallVec;

use super::NodeContext;
use crate::collector::{Accumulator, Collector, UndoToken};
use crate::error::{ScoreError, ScoreResult};
use crate::graph::NodeId;
use crate::tuple::{Slot, TupleId, TupleValues};

type GroupKey = SmallVec<[scoreforge_core::Value; 2]>;

#[derive(Debug)]
pub(crate) struct GroupEntry {
    key: GroupKey,
    undos: Vec<UndoToken>,
}

#[derive(Debug)]
struct Group {
    accumulators: Vec<Box<dyn Accumulator>>,
    size: usize,
    output: Option<TupleId>,
}

#[derive(Debug)]
pub(crate) struct GroupNode {
    id: NodeId,
    keys: Vec<Expr>,
    collectors: Vec<Collector>,
    groups: IndexMap<GroupKey, Group>,
    dirty: IndexSet<GroupKey>,
}

impl GroupNode {
    pub fn new(id: NodeId, keys: Vec<Expr>, collectors: Vec<Collector>) -> Self {
        Self {
            id,
            keys,
            collectors,
            groups: IndexMap::new(),
            dirty: IndexSet::new(),
        }
    }

    pub fn insert<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
    ) -> ScoreResult<()> {
        let values = ctx.arena.values(tuple)?;
        let key = self
            .keys
            .iter()
            .map(|k| ctx.eval.eval(k, values))
            .collect::<ScoreResult<GroupKey>>()?;
        let inputs = self
            .collectors
            .iter()
            .map(|c| c.extract(&ctx.eval, values))
            .collect::<ScoreResult<Vec<_>>>()?;

        let collectors = &self.collectors;
        let group = self.groups.entry(key.clone()).or_insert_with(|| Group {
            accumulators: collectors.iter().map(Collector::supplier).collect(),
            size: 0,
            output: None,
        });
        let mut undos = Vec::with_capacity(inputs.len());
        for (acc, input) in group.accumulators.iter_mut().zip(inputs) {
            undos.push(acc.insert(input)?);
        }
        group.size += 1;
        self.dirty.insert(key.clone());
        ctx.arena
            .put_slot(tuple, slot, Slot::Group(GroupEntry { key, undos }))
    }

    pub fn update<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
    ) -> ScoreResult<()> {
        self.retract(ctx, tuple, slot)?;
        self.insert(ctx, tuple, slot)
    }

    pub fn retract<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
    ) -> ScoreResult<()> {
        let entry = match ctx.arena.take_slot(tuple, slot)? {
            Slot::Group(entry) => entry,
            _ => return Err(ScoreError::MissingSlot { tuple, node: "group_by" }),
        };
        let group = self
            .groups
            .get_mut(&entry.key)
            .ok_or(ScoreError::MissingSlot { tuple, node: "group_by" })?;
        for (acc, undo) in group.accumulators.iter_mut().zip(entry.undos) {
            acc.undo(undo)?;
        }
        group.size -= 1;
        self.dirty.insert(entry.key);
        Ok(())
    }

    /// Emits the groups touched since the last flush.
    pub fn finalize<Sc: Score>(&mut self, ctx: &mut NodeContext<'_, Sc>) -> ScoreResult<()> {
        for key in std::mem::take(&mut self.dirty) {
            let Some(group) = self.groups.get_mut(&key) else {
                continue;
            };
            if group.size == 0 {
                if let Some(output) = group.output.take() {
                    ctx.retract(output)?;
                }
                self.groups.shift_remove(&key);
                continue;
            }

            let mut values: TupleValues = key.iter().cloned().collect();
            for acc in &group.accumulators {
                values.push(acc.result(&ctx.eval)?);
            }
            // Refreshed even when the values are equal: a key may be a fact
            // whose fields changed, and downstream nodes read through it.
            match group.output {
                None => group.output = Some(ctx.create(self.id, values)),
                Some(output) => ctx.update(output, values)?,
            }
        }
        Ok(())
    }
}
