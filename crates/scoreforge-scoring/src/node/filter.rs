use scoreforge_core::{Expr, Score};

use super::NodeContext;
use crate::error::ScoreResult;
use crate::graph::NodeId;
use crate::tuple::{Slot, TupleId};

/// Passes tuples whose predicate holds.
#[derive(Debug)]
pub(crate) struct FilterNode {
    id: NodeId,
    predicate: Expr,
}

impl FilterNode {
    pub fn new(id: NodeId, predicate: Expr) -> Self {
        Self { id, predicate }
    }

    fn accepts<Sc: Score>(&self, ctx: &NodeContext<'_, Sc>, tuple: TupleId) -> ScoreResult<bool> {
        let values = ctx.arena.values(tuple)?;
        ctx.eval.test(&self.predicate, values)
    }

    pub fn insert<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
    ) -> ScoreResult<()> {
        if self.accepts(ctx, tuple)? {
            let values = ctx.values(tuple)?;
            let child = ctx.create(self.id, values);
            ctx.arena.put_slot(tuple, slot, Slot::Child(child))?;
        }
        Ok(())
    }

    pub fn update<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
    ) -> ScoreResult<()> {
        let accepted = self.accepts(ctx, tuple)?;
        match ctx.arena.take_slot(tuple, slot)? {
            Slot::Child(child) if accepted => {
                let values = ctx.values(tuple)?;
                ctx.update(child, values)?;
                ctx.arena.put_slot(tuple, slot, Slot::Child(child))?;
            }
            Slot::Child(child) => ctx.retract(child)?,
            _ if accepted => {
                let values = ctx.values(tuple)?;
                let child = ctx.create(self.id, values);
                ctx.arena.put_slot(tuple, slot, Slot::Child(child))?;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn retract<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
    ) -> ScoreResult<()> {
        if let Slot::Child(child) = ctx.arena.take_slot(tuple, slot)? {
            ctx.retract(child)?;
        }
        Ok(())
    }
}
