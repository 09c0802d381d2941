use scoreforge_core::{Score, Value};

use super::NodeContext;
use crate::error::ScoreResult;
use crate::impact::{ImpactKind, WeightedScoreImpacter};
use crate::stream::MatchWeight;
use crate::tuple::{Slot, TupleId};

/// Terminal node: one score impact per live tuple.
#[derive(Debug)]
pub(crate) struct ScoreNode<Sc: Score> {
    impacter: WeightedScoreImpacter<Sc>,
    match_weight: MatchWeight,
}

impl<Sc: Score> ScoreNode<Sc> {
    pub fn new(impacter: WeightedScoreImpacter<Sc>, match_weight: MatchWeight) -> Self {
        Self {
            impacter,
            match_weight,
        }
    }

    fn weight(&self, ctx: &NodeContext<'_, Sc>, values: &[Value]) -> ScoreResult<Value> {
        let weight = match self.match_weight.expr() {
            None => return Ok(Value::Int(1)),
            Some(expr) => ctx.eval.eval(expr, values)?,
        };
        // Long weighers accept int results.
        Ok(match (self.impacter.kind(), weight) {
            (ImpactKind::Long, Value::Int(w)) => Value::Long(i64::from(w)),
            (_, weight) => weight,
        })
    }

    pub fn insert(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
    ) -> ScoreResult<()> {
        let values = ctx.values(tuple)?;
        let weight = self.weight(ctx, &values)?;
        let undo = self
            .impacter
            .impact_value(ctx.inliner, &weight, || values.to_vec())?;
        ctx.arena.put_slot(tuple, slot, Slot::Impact(undo))
    }

    pub fn update(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
    ) -> ScoreResult<()> {
        self.retract(ctx, tuple, slot)?;
        self.insert(ctx, tuple, slot)
    }

    pub fn retract(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
    ) -> ScoreResult<()> {
        if let Slot::Impact(undo) = ctx.arena.take_slot(tuple, slot)? {
            ctx.inliner.undo(undo)?;
        }
        Ok(())
    }
}
