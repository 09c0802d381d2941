// Bi-join of a left and a right input.
//
// Each input tuple keeps a `JoinEntry` in the slot the join owns on it: its
// index key and the joined tuples it takes part in. Retraction walks those
// back-pointers instead of rescanning the other side.

use std::collections::{HashMap, HashSet};

use scoreforge_core::Score;

use super::index::TupleIndex;
use super::NodeContext;
use crate::error::{ScoreError, ScoreResult};
use crate::graph::{NodeId, Port};
use crate::joiner::{JoinKey, Joiner};
use crate::tuple::{Slot, TupleId, TupleValues};

#[derive(Debug)]
pub(crate) struct JoinEntry {
    key: JoinKey,
    outputs: Vec<TupleId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn of(port: Port) -> Self {
        match port {
            Port::Right => Side::Right,
            Port::Left | Port::Single => Side::Left,
        }
    }

    fn other(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Orders `(own, other)` as `(left, right)`.
    fn arrange(self, own: TupleId, other: TupleId) -> (TupleId, TupleId) {
        match self {
            Side::Left => (own, other),
            Side::Right => (other, own),
        }
    }

    /// The element of a `(left, right)` pair on the opposite side.
    fn partner(self, pair: (TupleId, TupleId)) -> TupleId {
        match self {
            Side::Left => pair.1,
            Side::Right => pair.0,
        }
    }
}

#[derive(Debug)]
pub(crate) struct JoinNode {
    id: NodeId,
    joiner: Joiner,
    exclude_self: bool,
    left_slot: usize,
    right_slot: usize,
    left_index: TupleIndex,
    right_index: TupleIndex,
    pairs: HashMap<TupleId, (TupleId, TupleId)>,
}

impl JoinNode {
    pub fn new(
        id: NodeId,
        joiner: Joiner,
        exclude_self: bool,
        left_slot: usize,
        right_slot: usize,
    ) -> Self {
        Self {
            id,
            joiner,
            exclude_self,
            left_slot,
            right_slot,
            left_index: TupleIndex::default(),
            right_index: TupleIndex::default(),
            pairs: HashMap::new(),
        }
    }

    fn slot(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left_slot,
            Side::Right => self.right_slot,
        }
    }

    fn index_mut(&mut self, side: Side) -> &mut TupleIndex {
        match side {
            Side::Left => &mut self.left_index,
            Side::Right => &mut self.right_index,
        }
    }

    fn index(&self, side: Side) -> &TupleIndex {
        match side {
            Side::Left => &self.left_index,
            Side::Right => &self.right_index,
        }
    }

    fn key<Sc: Score>(&self, ctx: &NodeContext<'_, Sc>, side: Side, tuple: TupleId) -> ScoreResult<JoinKey> {
        let values = ctx.arena.values(tuple)?;
        match side {
            Side::Left => self.joiner.left_key(&ctx.eval, values),
            Side::Right => self.joiner.right_key(&ctx.eval, values),
        }
    }

    /// Concatenated values of a pair, if the non-indexed predicates hold.
    fn joined<Sc: Score>(
        &self,
        ctx: &NodeContext<'_, Sc>,
        left: TupleId,
        right: TupleId,
    ) -> ScoreResult<Option<TupleValues>> {
        let left = ctx.arena.values(left)?;
        let right = ctx.arena.values(right)?;
        if !self.joiner.matches_remainder(&ctx.eval, left, right)? {
            return Ok(None);
        }
        let mut joined: TupleValues = left.iter().cloned().collect();
        joined.extend(right.iter().cloned());
        Ok(Some(joined))
    }

    /// Pairs `tuple` with every partner under `key` it is not yet paired with.
    fn match_bucket<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        side: Side,
        tuple: TupleId,
        key: &JoinKey,
        skip: &HashSet<TupleId>,
        outputs: &mut Vec<TupleId>,
    ) -> ScoreResult<()> {
        let other_slot = self.slot(side.other());
        for other in self.index(side.other()).get(key) {
            if (self.exclude_self && other == tuple) || skip.contains(&other) {
                continue;
            }
            let (left, right) = side.arrange(tuple, other);
            if let Some(values) = self.joined(ctx, left, right)? {
                let out = ctx.create(self.id, values);
                self.pairs.insert(out, (left, right));
                outputs.push(out);
                if let Slot::Join(entry) = ctx.arena.slot_mut(other, other_slot)? {
                    entry.outputs.push(out);
                }
            }
        }
        Ok(())
    }

    /// Forgets a joined tuple and retracts it.
    fn drop_pair<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        side: Side,
        out: TupleId,
    ) -> ScoreResult<()> {
        let pair = self.pairs.remove(&out).ok_or(ScoreError::MissingSlot {
            tuple: out,
            node: "join",
        })?;
        let partner = side.partner(pair);
        if let Slot::Join(entry) = ctx.arena.slot_mut(partner, self.slot(side.other()))? {
            entry.outputs.retain(|o| *o != out);
        }
        ctx.retract(out)
    }

    fn take_entry<Sc: Score>(
        &self,
        ctx: &mut NodeContext<'_, Sc>,
        side: Side,
        tuple: TupleId,
    ) -> ScoreResult<JoinEntry> {
        match ctx.arena.take_slot(tuple, self.slot(side))? {
            Slot::Join(entry) => Ok(entry),
            _ => Err(ScoreError::MissingSlot { tuple, node: "join" }),
        }
    }

    pub fn insert<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        port: Port,
    ) -> ScoreResult<()> {
        let side = Side::of(port);
        let key = self.key(ctx, side, tuple)?;
        self.index_mut(side).insert(key.clone(), tuple);
        let mut outputs = Vec::new();
        self.match_bucket(ctx, side, tuple, &key, &HashSet::new(), &mut outputs)?;
        ctx.arena
            .put_slot(tuple, self.slot(side), Slot::Join(JoinEntry { key, outputs }))
    }

    pub fn update<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        port: Port,
    ) -> ScoreResult<()> {
        let side = Side::of(port);
        let key = self.key(ctx, side, tuple)?;
        let mut entry = self.take_entry(ctx, side, tuple)?;
        let mut outputs = Vec::with_capacity(entry.outputs.len());
        let mut paired = HashSet::new();

        if entry.key != key {
            for out in entry.outputs.drain(..) {
                self.drop_pair(ctx, side, out)?;
            }
            self.index_mut(side).remove(&entry.key, tuple);
            self.index_mut(side).insert(key.clone(), tuple);
        } else {
            for out in entry.outputs.drain(..) {
                let pair = *self.pairs.get(&out).ok_or(ScoreError::MissingSlot {
                    tuple: out,
                    node: "join",
                })?;
                match self.joined(ctx, pair.0, pair.1)? {
                    Some(values) => {
                        ctx.update(out, values)?;
                        paired.insert(side.partner(pair));
                        outputs.push(out);
                    }
                    None => self.drop_pair(ctx, side, out)?,
                }
            }
        }

        self.match_bucket(ctx, side, tuple, &key, &paired, &mut outputs)?;
        entry.key = key;
        entry.outputs = outputs;
        ctx.arena.put_slot(tuple, self.slot(side), Slot::Join(entry))
    }

    pub fn retract<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        port: Port,
    ) -> ScoreResult<()> {
        let side = Side::of(port);
        let entry = self.take_entry(ctx, side, tuple)?;
        self.index_mut(side).remove(&entry.key, tuple);
        for out in entry.outputs {
            self.drop_pair(ctx, side, out)?;
        }
        Ok(())
    }
}
