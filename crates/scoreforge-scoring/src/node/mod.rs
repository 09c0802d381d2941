//! Runtime state of the nodes of one session.
//!
//! The node network is a shared blueprint; each session instantiates one
//! [`NodeState`] per node. Changes flow as tuple handles: a parent calls
//! `insert`, `update` or `retract` on each child with the slot the child owns
//! on the parent's tuple, and the child records whatever it needs in that
//! slot.

mod exists;
mod filter;
mod for_each;
mod group;
mod index;
mod join;
mod map;
mod score;

use scoreforge_core::{FactKey, Score, Value};

use crate::error::ScoreResult;
use crate::eval::EvalContext;
use crate::graph::{NodeDef, NodeId, NodeKind, NodeNetwork, Port};
use crate::impact::ScoreInliner;
use crate::tuple::{TupleArena, TupleId, TupleValues};

pub(crate) use exists::{ExistsLeftEntry, ExistsNode, ExistsRightEntry};
pub(crate) use filter::FilterNode;
pub(crate) use for_each::ForEachNode;
pub(crate) use group::{GroupEntry, GroupNode};
pub(crate) use join::{JoinEntry, JoinNode};
pub(crate) use map::{FlattenLastNode, MapNode};
pub(crate) use score::ScoreNode;

/// Everything a node may touch while handling a change.
pub(crate) struct NodeContext<'a, Sc: Score> {
    pub arena: &'a mut TupleArena<Sc>,
    pub queues: &'a mut [Vec<TupleId>],
    pub inliner: &'a mut ScoreInliner<Sc>,
    pub eval: EvalContext<'a>,
    pub network: &'a NodeNetwork<Sc>,
}

impl<Sc: Score> NodeContext<'_, Sc> {
    /// Creates a tuple owned by `owner` and queues it.
    pub fn create(&mut self, owner: NodeId, values: TupleValues) -> TupleId {
        let slots = self.network.edge_count(owner);
        let id = self.arena.create(owner, values, slots);
        self.queues[owner].push(id);
        id
    }

    /// Replaces a tuple's values and queues it as updated.
    pub fn update(&mut self, id: TupleId, values: TupleValues) -> ScoreResult<()> {
        self.arena.set_values(id, values)?;
        self.touch(id)
    }

    /// Queues a tuple as updated without changing its values.
    pub fn touch(&mut self, id: TupleId) -> ScoreResult<()> {
        if self.arena.mark_updating(id)? {
            self.enqueue(id)?;
        }
        Ok(())
    }

    pub fn retract(&mut self, id: TupleId) -> ScoreResult<()> {
        if self.arena.mark_retracting(id)? {
            self.enqueue(id)?;
        }
        Ok(())
    }

    fn enqueue(&mut self, id: TupleId) -> ScoreResult<()> {
        let owner = self.arena.get(id)?.owner;
        self.queues[owner].push(id);
        Ok(())
    }

    /// Copy of a tuple's values.
    pub fn values(&self, id: TupleId) -> ScoreResult<TupleValues> {
        Ok(self.arena.get(id)?.values.clone())
    }
}

/// Per-session state of one node.
pub(crate) enum NodeState<Sc: Score> {
    ForEach(ForEachNode),
    Filter(FilterNode),
    Map(MapNode),
    FlattenLast(FlattenLastNode),
    Join(JoinNode),
    Exists(ExistsNode),
    Group(GroupNode),
    Score(ScoreNode<Sc>),
}

impl<Sc: Score> NodeState<Sc> {
    pub fn new(id: NodeId, def: &NodeDef<Sc>) -> Self {
        let slot = |i: usize| def.input_slots.get(i).copied().unwrap_or_default();
        match &def.kind {
            NodeKind::ForEach { .. } => NodeState::ForEach(ForEachNode::new(id)),
            NodeKind::Filter { predicate } => {
                NodeState::Filter(FilterNode::new(id, predicate.clone()))
            }
            NodeKind::Map { mappings } => NodeState::Map(MapNode::new(id, mappings.clone())),
            NodeKind::FlattenLast => NodeState::FlattenLast(FlattenLastNode::new(id)),
            NodeKind::Join {
                joiner,
                exclude_self,
            } => NodeState::Join(JoinNode::new(
                id,
                joiner.clone(),
                *exclude_self,
                slot(0),
                slot(1),
            )),
            NodeKind::Exists {
                joiner,
                should_exist,
                exclude_self,
            } => NodeState::Exists(ExistsNode::new(
                id,
                joiner.clone(),
                *should_exist,
                *exclude_self,
                slot(0),
                slot(1),
            )),
            NodeKind::GroupBy { keys, collectors } => {
                NodeState::Group(GroupNode::new(id, keys.clone(), collectors.clone()))
            }
            NodeKind::Score {
                impacter,
                match_weight,
            } => NodeState::Score(ScoreNode::new(impacter.clone(), match_weight.clone())),
        }
    }

    pub fn insert(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
        port: Port,
    ) -> ScoreResult<()> {
        match self {
            NodeState::ForEach(_) => Ok(()),
            NodeState::Filter(n) => n.insert(ctx, tuple, slot),
            NodeState::Map(n) => n.insert(ctx, tuple, slot),
            NodeState::FlattenLast(n) => n.insert(ctx, tuple, slot),
            NodeState::Join(n) => n.insert(ctx, tuple, port),
            NodeState::Exists(n) => n.insert(ctx, tuple, port),
            NodeState::Group(n) => n.insert(ctx, tuple, slot),
            NodeState::Score(n) => n.insert(ctx, tuple, slot),
        }
    }

    pub fn update(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
        port: Port,
    ) -> ScoreResult<()> {
        match self {
            NodeState::ForEach(_) => Ok(()),
            NodeState::Filter(n) => n.update(ctx, tuple, slot),
            NodeState::Map(n) => n.update(ctx, tuple, slot),
            NodeState::FlattenLast(n) => n.update(ctx, tuple, slot),
            NodeState::Join(n) => n.update(ctx, tuple, port),
            NodeState::Exists(n) => n.update(ctx, tuple, port),
            NodeState::Group(n) => n.update(ctx, tuple, slot),
            NodeState::Score(n) => n.update(ctx, tuple, slot),
        }
    }

    pub fn retract(
        &mut self,
        ctx: &mut NodeContext<'_, Sc>,
        tuple: TupleId,
        slot: usize,
        port: Port,
    ) -> ScoreResult<()> {
        match self {
            NodeState::ForEach(_) => Ok(()),
            NodeState::Filter(n) => n.retract(ctx, tuple, slot),
            NodeState::Map(n) => n.retract(ctx, tuple, slot),
            NodeState::FlattenLast(n) => n.retract(ctx, tuple, slot),
            NodeState::Join(n) => n.retract(ctx, tuple, port),
            NodeState::Exists(n) => n.retract(ctx, tuple, port),
            NodeState::Group(n) => n.retract(ctx, tuple, slot),
            NodeState::Score(n) => n.retract(ctx, tuple, slot),
        }
    }

    /// Emits pending output before the node's queue is flushed.
    pub fn finalize(&mut self, ctx: &mut NodeContext<'_, Sc>) -> ScoreResult<()> {
        match self {
            NodeState::Group(n) => n.finalize(ctx),
            _ => Ok(()),
        }
    }

    pub fn as_for_each(&mut self) -> Option<&mut ForEachNode> {
        match self {
            NodeState::ForEach(n) => Some(n),
            _ => None,
        }
    }
}

/// Values of a root tuple for `key`.
pub(crate) fn root_values(key: FactKey) -> TupleValues {
    let mut values = TupleValues::new();
    values.push(Value::Fact(key));
    values
}
