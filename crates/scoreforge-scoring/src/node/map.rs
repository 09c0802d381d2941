use scoreforge_core::{Expr, Score, Value};

use super::NodeContext;
use crate::error::{ScoreError, ScoreResult};
use crate::graph::NodeId;
use crate::tuple::{Slot, TupleId, TupleValues};

/// Replaces each tuple with its mapped values.
#[derive(Debug)]
pub(crate) struct MapNode {
    id: NodeId,
    mappings: Vec<Expr>,
}

impl MapNode {
    pub fn new(id: NodeId, mappings: Vec<Expr>) -> Self {
        Self { id, mappings }
    }

    fn map<Sc: Score>(&self, ctx: &NodeContext<'_, Sc>, tuple: TupleId) -> ScoreResult<TupleValues> {
        let values = ctx.arena.values(tuple)?;
        self.mappings
            .iter()
            .map(|mapping| ctx.eval.eval(mapping, values))
            .collect()
    }

    pub fn insert<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
    ) -> ScoreResult<()> {
        let mapped = self.map(ctx, tuple)?;
        let child = ctx.create(self.id, mapped);
        ctx.arena.put_slot(tuple, slot, Slot::Child(child))
    }

    /// Always propagates: mapped values may reference facts whose fields
    /// changed.
    pub fn update<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
    ) -> ScoreResult<()> {
        let mapped = self.map(ctx, tuple)?;
        match ctx.arena.take_slot(tuple, slot)? {
            Slot::Child(child) => {
                ctx.update(child, mapped)?;
                ctx.arena.put_slot(tuple, slot, Slot::Child(child))
            }
            _ => {
                let child = ctx.create(self.id, mapped);
                ctx.arena.put_slot(tuple, slot, Slot::Child(child))
            }
        }
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

/// Expands the last element of each tuple, a list, into one tuple per item.
#[derive(Debug)]
pub(crate) struct FlattenLastNode {
    id: NodeId,
}

impl FlattenLastNode {
    pub fn new(id: NodeId) -> Self {
        Self { id }
    }

    fn expand<Sc: Score>(ctx: &NodeContext<'_, Sc>, tuple: TupleId) -> ScoreResult<Vec<TupleValues>> {
        let values = ctx.arena.values(tuple)?;
        let (last, prefix) = values.split_last().ok_or(ScoreError::ParamOutOfRange {
            param: 0,
            arity: 0,
        })?;
        match last {
            Value::None => Err(ScoreError::NullCollection {
                accessor: "flatten_last".into(),
            }),
            Value::List(items) => Ok(items
                .iter()
                .map(|item| {
                    let mut expanded: TupleValues = prefix.iter().cloned().collect();
                    expanded.push(item.clone());
                    expanded
                })
                .collect()),
            other => Err(ScoreError::TypeMismatch {
                context: "flatten_last",
                expected: "list",
                actual: other.kind(),
            }),
        }
    }

    pub fn insert<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
    ) -> ScoreResult<()> {
        let children = Self::expand(ctx, tuple)?
            .into_iter()
            .map(|values| ctx.create(self.id, values))
            .collect();
        ctx.arena.put_slot(tuple, slot, Slot::Children(children))
    }

    /// Updates children position by position, then creates or retracts the
    /// difference.
    pub fn update<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
    ) -> ScoreResult<()> {
        let expanded = Self::expand(ctx, tuple)?;
        let mut children = match ctx.arena.take_slot(tuple, slot)? {
            Slot::Children(children) => children,
            _ => Vec::new(),
        };
        for stale in children.split_off(expanded.len().min(children.len())) {
            ctx.retract(stale)?;
        }
        let mut expanded = expanded.into_iter();
        for (child, values) in children.iter().zip(expanded.by_ref()) {
            ctx.update(*child, values)?;
        }
        for values in expanded {
            children.push(ctx.create(self.id, values));
        }
        ctx.arena.put_slot(tuple, slot, Slot::Children(children))
    }

    pub fn retract<Sc: Score>(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
    ) -> ScoreResult<()> {
        if let Slot::Children(children) = ctx.arena.take_slot(tuple, slot)? {
            for child in children {
                ctx.retract(child)?;
            }
        }
        Ok(())
    }
}
