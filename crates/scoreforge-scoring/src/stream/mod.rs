//! Constraint stream definitions.
//!
//! Streams are immutable descriptions of a dataflow, built through
//! [`ConstraintFactory`] and terminated by `penalize`, `reward` or `impact`.
//! They hold no runtime state; [`crate::graph::NodeNetwork::build`] compiles a
//! set of constraints into a shared node network.

mod constraint;
pub mod document;
mod factory;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use scoreforge_core::Expr;

use crate::collector::Collector;
use crate::joiner::Joiner;

pub use constraint::{Constraint, ConstraintBuilder, MatchWeight};
pub use factory::{BiStream, ConstraintFactory, QuadStream, Stream, TriStream, UniStream};

/// One operation of a stream, with its parent stream(s).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamOp {
    ForEach {
        class: usize,
    },
    Filter {
        parent: Arc<StreamDef>,
        predicate: Expr,
    },
    Join {
        left: Arc<StreamDef>,
        right: Arc<StreamDef>,
        joiner: Joiner,
        allow_self: bool,
    },
    Exists {
        parent: Arc<StreamDef>,
        other: Arc<StreamDef>,
        joiner: Joiner,
        should_exist: bool,
        allow_self: bool,
    },
    GroupBy {
        parent: Arc<StreamDef>,
        keys: Vec<Expr>,
        collectors: Vec<Collector>,
    },
    Map {
        parent: Arc<StreamDef>,
        mappings: Vec<Expr>,
    },
    FlattenLast {
        parent: Arc<StreamDef>,
    },
}

/// A stream operation together with the arity of the tuples it produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamDef {
    op: StreamOp,
    arity: usize,
}

impl StreamDef {
    pub(crate) fn new(op: StreamOp, arity: usize) -> Arc<Self> {
        Arc::new(Self { op, arity })
    }

    pub fn op(&self) -> &StreamOp {
        &self.op
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Parent streams, left first.
    pub fn parents(&self) -> Vec<&Arc<StreamDef>> {
        match &self.op {
            StreamOp::ForEach { .. } => Vec::new(),
            StreamOp::Filter { parent, .. }
            | StreamOp::GroupBy { parent, .. }
            | StreamOp::Map { parent, .. }
            | StreamOp::FlattenLast { parent } => vec![parent],
            StreamOp::Join { left, right, .. } => vec![left, right],
            StreamOp::Exists { parent, other, .. } => vec![parent, other],
        }
    }

    /// Short operation name for logs and error messages.
    pub fn op_name(&self) -> &'static str {
        match &self.op {
            StreamOp::ForEach { .. } => "for_each",
            StreamOp::Filter { .. } => "filter",
            StreamOp::Join { .. } => "join",
            StreamOp::Exists {
                should_exist: true, ..
            } => "if_exists",
            StreamOp::Exists { .. } => "if_not_exists",
            StreamOp::GroupBy { .. } => "group_by",
            StreamOp::Map { .. } => "map",
            StreamOp::FlattenLast { .. } => "flatten_last",
        }
    }
}
