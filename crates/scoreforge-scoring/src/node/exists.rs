// `if_exists` / `if_not_exists`: passes left tuples by the number of right
// tuples matching them.

use scoreforge_core::Score;

use super::index::TupleIndex;
use super::NodeContext;
use crate::error::{ScoreError, ScoreResult};
use crate::graph::{NodeId, Port};
use crate::joiner::{JoinKey, Joiner};
use crate::tuple::{Slot, TupleId};

#[derive(Debug)]
pub(crate) struct ExistsLeftEntry {
    key: JoinKey,
    /// Right tuples currently matching.
    matches: Vec<TupleId>,
    child: Option<TupleId>,
}

#[derive(Debug)]
pub(crate) struct ExistsRightEntry {
    key: JoinKey,
    /// Left tuples currently matched.
    matches: Vec<TupleId>,
}

#[derive(Debug)]
pub(crate) struct ExistsNode {
    id: NodeId,
    joiner: Joiner,
    should_exist: bool,
    exclude_self: bool,
    left_slot: usize,
    right_slot: usize,
    left_index: TupleIndex,
    right_index: TupleIndex,
}

impl ExistsNode {
    pub fn new(
        id: NodeId,
        joiner: Joiner,
        should_exist: bool,
        exclude_self: bool,
        left_slot: usize,
        right_slot: usize,
    ) -> Self {
        Self {
            id,
            joiner,
            should_exist,
            exclude_self,
            left_slot,
            right_slot,
            left_index: TupleIndex::default(),
            right_index: TupleIndex::default(),
        }
    }

    fn pairs<Sc: Score>(
        &self,
        ctx: &NodeContext<'_, Sc>,
        left: TupleId,
        right: TupleId,
    ) -> ScoreResult<bool> {
        if self.exclude_self && left == right {
            return Ok(false);
        }
        let l = ctx.arena.values(left)?;
        let r = ctx.arena.values(right)?;
        self.joiner.matches_remainder(&ctx.eval, l, r)
    }

    fn left_entry<'c, Sc: Score>(
        &self,
        ctx: &'c mut NodeContext<'_, Sc>,
        left: TupleId,
    ) -> ScoreResult<&'c mut ExistsLeftEntry> {
        match ctx.arena.slot_mut(left, self.left_slot)? {
            Slot::ExistsLeft(entry) => Ok(entry),
            _ => Err(ScoreError::MissingSlot {
                tuple: left,
                node: "exists",
            }),
        }
    }

    fn right_entry<'c, Sc: Score>(
        &self,
        ctx: &'c mut NodeContext<'_, Sc>,
        right: TupleId,
    ) -> ScoreResult<&'c mut ExistsRightEntry> {
        match ctx.arena.slot_mut(right, self.right_slot)? {
            Slot::ExistsRight(entry) => Ok(entry),
            _ => Err(ScoreError::MissingSlot {
                tuple: right,
                node: "exists",
            }),
        }
    }

    /// Creates or retracts the left tuple's child to match its match count.
    fn reconcile<Sc: Score>(&self, ctx: &mut NodeContext<'_, Sc>, left: TupleId) -> ScoreResult<()> {
        let entry = self.left_entry(ctx, left)?;
        let passes = entry.matches.is_empty() != self.should_exist;
        match (entry.child, passes) {
            (None, true) => {
                let values = ctx.values(left)?;
                let child = ctx.create(self.id, values);
                self.left_entry(ctx, left)?.child = Some(child);
            }
            (Some(child), false) => {
                entry.child = None;
                ctx.retract(child)?;
            }
            _ => {}
        }
        Ok(())
    }

    // Left side

    fn scan_rights<Sc: Score>(
        &self,
        ctx: &mut NodeContext<'_, Sc>,
        left: TupleId,
        key: &JoinKey,
    ) -> ScoreResult<Vec<TupleId>> {
        let mut matches = Vec::new();
        for right in self.right_index.get(key) {
            if self.pairs(ctx, left, right)? {
                self.right_entry(ctx, right)?.matches.push(left);
                matches.push(right);
            }
        }
        Ok(matches)
    }

    fn unlink_left<Sc: Score>(
        &self,
        ctx: &mut NodeContext<'_, Sc>,
        left: TupleId,
        rights: &[TupleId],
    ) -> ScoreResult<()> {
        for right in rights {
            if let Slot::ExistsRight(entry) = ctx.arena.slot_mut(*right, self.right_slot)? {
                entry.matches.retain(|l| *l != left);
            }
        }
        Ok(())
    }

    fn insert_left<Sc: Score>(&mut self, ctx: &mut NodeContext<'_, Sc>, left: TupleId) -> ScoreResult<()> {
        let key = self.joiner.left_key(&ctx.eval, ctx.arena.values(left)?)?;
        self.left_index.insert(key.clone(), left);
        let matches = self.scan_rights(ctx, left, &key)?;
        let entry = ExistsLeftEntry {
            key,
            matches,
            child: None,
        };
        ctx.arena
            .put_slot(left, self.left_slot, Slot::ExistsLeft(entry))?;
        self.reconcile(ctx, left)
    }

    fn update_left<Sc: Score>(&mut self, ctx: &mut NodeContext<'_, Sc>, left: TupleId) -> ScoreResult<()> {
        let key = self.joiner.left_key(&ctx.eval, ctx.arena.values(left)?)?;
        let (old_key, old_matches) = {
            let entry = self.left_entry(ctx, left)?;
            (entry.key.clone(), std::mem::take(&mut entry.matches))
        };
        self.unlink_left(ctx, left, &old_matches)?;
        if old_key != key {
            self.left_index.remove(&old_key, left);
            self.left_index.insert(key.clone(), left);
        }
        let matches = self.scan_rights(ctx, left, &key)?;
        let child = {
            let entry = self.left_entry(ctx, left)?;
            entry.key = key;
            entry.matches = matches;
            entry.child
        };
        if let Some(child) = child {
            let values = ctx.values(left)?;
            ctx.update(child, values)?;
        }
        self.reconcile(ctx, left)
    }

    fn retract_left<Sc: Score>(&mut self, ctx: &mut NodeContext<'_, Sc>, left: TupleId) -> ScoreResult<()> {
        let entry = match ctx.arena.take_slot(left, self.left_slot)? {
            Slot::ExistsLeft(entry) => entry,
            _ => {
                return Err(ScoreError::MissingSlot {
                    tuple: left,
                    node: "exists",
                })
            }
        };
        self.left_index.remove(&entry.key, left);
        self.unlink_left(ctx, left, &entry.matches)?;
        if let Some(child) = entry.child {
            ctx.retract(child)?;
        }
        Ok(())
    }

    // Right side

    fn link_right<Sc: Score>(
        &self,
        ctx: &mut NodeContext<'_, Sc>,
        right: TupleId,
        key: &JoinKey,
    ) -> ScoreResult<Vec<TupleId>> {
        let mut matched = Vec::new();
        for left in self.left_index.get(key) {
            if self.pairs(ctx, left, right)? {
                self.left_entry(ctx, left)?.matches.push(right);
                matched.push(left);
            }
        }
        Ok(matched)
    }

    fn unlink_right<Sc: Score>(
        &self,
        ctx: &mut NodeContext<'_, Sc>,
        right: TupleId,
        lefts: &[TupleId],
    ) -> ScoreResult<()> {
        for left in lefts {
            if let Slot::ExistsLeft(entry) = ctx.arena.slot_mut(*left, self.left_slot)? {
                entry.matches.retain(|r| *r != right);
            }
        }
        Ok(())
    }

    fn insert_right<Sc: Score>(&mut self, ctx: &mut NodeContext<'_, Sc>, right: TupleId) -> ScoreResult<()> {
        let key = self.joiner.right_key(&ctx.eval, ctx.arena.values(right)?)?;
        self.right_index.insert(key.clone(), right);
        let matches = self.link_right(ctx, right, &key)?;
        for left in &matches {
            self.reconcile(ctx, *left)?;
        }
        ctx.arena
            .put_slot(right, self.right_slot, Slot::ExistsRight(ExistsRightEntry { key, matches }))
    }

    fn update_right<Sc: Score>(&mut self, ctx: &mut NodeContext<'_, Sc>, right: TupleId) -> ScoreResult<()> {
        let key = self.joiner.right_key(&ctx.eval, ctx.arena.values(right)?)?;
        let (old_key, old_matches) = {
            let entry = self.right_entry(ctx, right)?;
            (entry.key.clone(), std::mem::take(&mut entry.matches))
        };
        self.unlink_right(ctx, right, &old_matches)?;
        if old_key != key {
            self.right_index.remove(&old_key, right);
            self.right_index.insert(key.clone(), right);
        }
        let matches = self.link_right(ctx, right, &key)?;
        {
            let entry = self.right_entry(ctx, right)?;
            entry.key = key;
            entry.matches = matches.clone();
        }
        for left in old_matches.iter().chain(&matches) {
            // A left retracted earlier in this flush is already gone.
            if matches!(ctx.arena.slot_mut(*left, self.left_slot), Ok(Slot::ExistsLeft(_))) {
                self.reconcile(ctx, *left)?;
            }
        }
        Ok(())
    }

    fn retract_right<Sc: Score>(&mut self, ctx: &mut NodeContext<'_, Sc>, right: TupleId) -> ScoreResult<()> {
        let entry = match ctx.arena.take_slot(right, self.right_slot)? {
            Slot::ExistsRight(entry) => entry,
            _ => {
                return Err(ScoreError::MissingSlot {
                    tuple: right,
                    node: "exists",
                })
            }
        };
        self.right_index.remove(&entry.key, right);
        self.unlink_right(ctx, right, &entry.matches)?;
        for left in &entry.matches {
            self.reconcile(ctx, *left)?;
        }
        Ok(())
    }

    pub fn insert<Sc: Score>(&mut self, ctx: &mut NodeContext<'_, Sc>, tuple: TupleId, port: Port) -> ScoreResult<()> {
        match port {
            Port::Right => self.insert_right(ctx, tuple),
            Port::Left | Port::Single => self.insert_left(ctx, tuple),
        }
    }

    pub fn update<Sc: Score>(&mut self, ctx: &mut NodeContext<'_, Sc>, tuple: TupleId, port: Port) -> ScoreResult<()> {
        match port {
            Port::Right => self.update_right(ctx, tuple),
            Port::Left | Port::Single => self.update_left(ctx, tuple),
        }
    }

    pub fn retract<Sc: Score>(&mut self, ctx: &mut NodeContext<'_, Sc>, tuple: TupleId, port: Port) -> ScoreResult<()> {
        match port {
            Port::Right => self.retract_right(ctx, tuple),
            Port::Left | Port::Single => self.retract_left(ctx, tuple),
        }
    }
}
