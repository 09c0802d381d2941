//! The compiled node network.
//!
//! A [`NodeNetwork`] is the immutable blueprint shared by every session of a
//! [`crate::session::ConstraintSessionFactory`]. Sessions keep their own
//! per-node state next to it.

mod builder;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use scoreforge_core::{ConstraintRef, Expr, Score};

use crate::collector::Collector;
use crate::error::BuildResult;
use crate::function::FunctionRegistry;
use crate::impact::WeightedScoreImpacter;
use crate::joiner::Joiner;
use crate::stream::{Constraint, MatchWeight};

pub use builder::NodeGraphBuilder;

pub type NodeId = usize;

/// Which input of the child an edge feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    Single,
    Left,
    Right,
}

/// A downstream edge. The edge's position in its parent's `children` list is
/// also the slot index the child owns on every parent tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub child: NodeId,
    pub port: Port,
}

#[derive(Debug, Clone)]
pub enum NodeKind<Sc: Score> {
    ForEach {
        class: usize,
    },
    Filter {
        predicate: Expr,
    },
    Join {
        joiner: Joiner,
        /// Both inputs come from the same node and a tuple may not pair
        /// with itself.
        exclude_self: bool,
    },
    Exists {
        joiner: Joiner,
        should_exist: bool,
        exclude_self: bool,
    },
    GroupBy {
        keys: Vec<Expr>,
        collectors: Vec<Collector>,
    },
    Map {
        mappings: Vec<Expr>,
    },
    FlattenLast,
    Score {
        impacter: WeightedScoreImpacter<Sc>,
        match_weight: MatchWeight,
    },
}

impl<Sc: Score> NodeKind<Sc> {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::ForEach { .. } => "for_each",
            NodeKind::Filter { .. } => "filter",
            NodeKind::Join { .. } => "join",
            NodeKind::Exists {
                should_exist: true, ..
            } => "if_exists",
            NodeKind::Exists { .. } => "if_not_exists",
            NodeKind::GroupBy { .. } => "group_by",
            NodeKind::Map { .. } => "map",
            NodeKind::FlattenLast => "flatten_last",
            NodeKind::Score { .. } => "score",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeDef<Sc: Score> {
    pub kind: NodeKind<Sc>,
    /// 0 for roots, otherwise 1 + the highest parent layer.
    pub layer: usize,
    /// Arity of the tuples this node emits.
    pub arity: usize,
    pub parents: Vec<NodeId>,
    /// For each parent, the slot this node owns on that parent's tuples.
    pub input_slots: Vec<usize>,
    pub children: Vec<Edge>,
}

/// Immutable compiled form of a constraint set.
#[derive(Debug)]
pub struct NodeNetwork<Sc: Score> {
    nodes: Vec<NodeDef<Sc>>,
    layers: Vec<Vec<NodeId>>,
    roots: HashMap<usize, Vec<NodeId>>,
    constraints: Vec<(ConstraintRef, Sc)>,
    shared_count: usize,
}

impl<Sc: Score> NodeNetwork<Sc> {
    /// Compiles `constraints` and shares structurally identical nodes.
    pub fn build(
        constraints: &[Constraint<Sc>],
        functions: &FunctionRegistry,
    ) -> BuildResult<Arc<Self>> {
        let mut builder = NodeGraphBuilder::new(functions);
        for constraint in constraints {
            builder.add_constraint(constraint)?;
        }
        Ok(Arc::new(builder.finish()))
    }

    pub(crate) fn from_parts(
        nodes: Vec<NodeDef<Sc>>,
        constraints: Vec<(ConstraintRef, Sc)>,
        shared_count: usize,
    ) -> Self {
        let layer_count = nodes.iter().map(|n| n.layer + 1).max().unwrap_or(0);
        let mut layers = vec![Vec::new(); layer_count];
        let mut roots: HashMap<usize, Vec<NodeId>> = HashMap::new();
        for (id, node) in nodes.iter().enumerate() {
            layers[node.layer].push(id);
            if let NodeKind::ForEach { class } = node.kind {
                roots.entry(class).or_default().push(id);
            }
        }
        Self {
            nodes,
            layers,
            roots,
            constraints,
            shared_count,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of downstream edges leaving `node`.
    pub fn edge_count(&self, node: NodeId) -> usize {
        self.nodes.get(node).map_or(0, |n| n.children.len())
    }

    pub fn node(&self, node: NodeId) -> Option<&NodeDef<Sc>> {
        self.nodes.get(node)
    }

    pub fn nodes(&self) -> &[NodeDef<Sc>] {
        &self.nodes
    }

    pub fn layers(&self) -> &[Vec<NodeId>] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// `for_each` nodes fed by facts of `class`.
    pub fn roots_for(&self, class: usize) -> &[NodeId] {
        self.roots.get(&class).map(Vec::as_slice).unwrap_or_default()
    }

    /// Constraint references and weights, in constraint index order.
    pub fn constraints(&self) -> &[(ConstraintRef, Sc)] {
        &self.constraints
    }

    /// How many node requests were answered from the sharing cache.
    pub fn shared_count(&self) -> usize {
        self.shared_count
    }

    /// Ids of the nodes of a kind, for tests and diagnostics.
    pub fn nodes_named(&self, name: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.kind.name() == name)
            .map(|(id, _)| id)
            .collect()
    }
}
