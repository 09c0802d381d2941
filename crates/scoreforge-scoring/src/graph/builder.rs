// Bottom-up compilation of stream definitions into nodes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use scoreforge_core::{ConstraintRef, Expr, Score};
use tracing::debug;

use super::{Edge, NodeDef, NodeId, NodeKind, NodeNetwork, Port};
use crate::collector::{Collector, ExprScope};
use crate::error::{BuildError, BuildResult};
use crate::function::FunctionRegistry;
use crate::impact::WeightedScoreImpacter;
use crate::joiner::Joiner;
use crate::stream::{Constraint, MatchWeight, StreamDef, StreamOp};

/// Identity of a shareable node: kind, resolved parents and configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
    ForEach {
        class: usize,
    },
    Filter {
        parent: NodeId,
        predicate: Expr,
    },
    Join {
        left: NodeId,
        right: NodeId,
        joiner: Joiner,
        allow_self: bool,
    },
    Exists {
        parent: NodeId,
        other: NodeId,
        joiner: Joiner,
        should_exist: bool,
        allow_self: bool,
    },
    GroupBy {
        parent: NodeId,
        keys: Vec<Expr>,
        collectors: Vec<Collector>,
    },
    Map {
        parent: NodeId,
        mappings: Vec<Expr>,
    },
    FlattenLast {
        parent: NodeId,
    },
}

/// Accumulates constraints into a [`NodeNetwork`].
///
/// The first request for a node creates it; later identical requests get the
/// cached id, and their consumers add another downstream edge to it.
pub struct NodeGraphBuilder<'f, Sc: Score> {
    functions: &'f FunctionRegistry,
    nodes: Vec<NodeDef<Sc>>,
    cache: HashMap<NodeKey, NodeId>,
    constraints: Vec<(ConstraintRef, Sc)>,
    names: HashSet<ConstraintRef>,
    shared_count: usize,
}

impl<'f, Sc: Score> NodeGraphBuilder<'f, Sc> {
    pub fn new(functions: &'f FunctionRegistry) -> Self {
        Self {
            functions,
            nodes: Vec::new(),
            cache: HashMap::new(),
            constraints: Vec::new(),
            names: HashSet::new(),
            shared_count: 0,
        }
    }

    /// Resolves the constraint's stream and attaches a terminal score node.
    pub fn add_constraint(&mut self, constraint: &Constraint<Sc>) -> BuildResult<NodeId> {
        let constraint_ref = constraint.constraint_ref();
        if !self.names.insert(constraint_ref.clone()) {
            return Err(BuildError::DuplicateConstraint(constraint_ref.full_name()));
        }

        let parent = self.resolve(constraint.stream())?;
        let arity = self.nodes[parent].arity;
        let match_weight = constraint.match_weight();
        if let Some(expr) = match_weight.expr() {
            self.check_expr(expr, arity, || {
                format!("match weight of '{}'", constraint_ref.full_name())
            })?;
        }
        if matches!(match_weight, MatchWeight::Decimal(_)) && !Sc::supports_decimal_weights() {
            return Err(BuildError::DecimalWeightUnsupported {
                constraint: constraint_ref.full_name(),
                score_type: Sc::type_name(),
            });
        }

        let index = self.constraints.len();
        self.constraints
            .push((constraint_ref.clone(), constraint.weight()));
        let impacter = WeightedScoreImpacter::new(
            index,
            constraint.impact_type(),
            match_weight.kind(),
            constraint.weight(),
        );
        let kind = NodeKind::Score {
            impacter,
            match_weight: match_weight.clone(),
        };
        Ok(self.push(kind, 0, &[(parent, Port::Single)]))
    }

    pub fn finish(self) -> NodeNetwork<Sc> {
        let network = NodeNetwork::from_parts(self.nodes, self.constraints, self.shared_count);
        debug!(
            event = "network_built",
            node_count = network.node_count(),
            shared_count = network.shared_count(),
            layer_count = network.layer_count(),
            constraint_count = network.constraints().len(),
        );
        network
    }

    fn resolve(&mut self, def: &Arc<StreamDef>) -> BuildResult<NodeId> {
        let arity = def.arity();
        match def.op() {
            StreamOp::ForEach { class } => Ok(self.intern(
                NodeKey::ForEach { class: *class },
                NodeKind::ForEach { class: *class },
                1,
                &[],
            )),

            StreamOp::Filter { parent, predicate } => {
                let parent = self.resolve(parent)?;
                self.check_expr(predicate, self.nodes[parent].arity, || "filter".into())?;
                Ok(self.intern(
                    NodeKey::Filter {
                        parent,
                        predicate: predicate.clone(),
                    },
                    NodeKind::Filter {
                        predicate: predicate.clone(),
                    },
                    arity,
                    &[(parent, Port::Single)],
                ))
            }

            StreamOp::Join {
                left,
                right,
                joiner,
                allow_self,
            } => {
                let left = self.resolve(left)?;
                let right = self.resolve(right)?;
                self.check_joiner(joiner, left, right, "join")?;
                Ok(self.intern(
                    NodeKey::Join {
                        left,
                        right,
                        joiner: joiner.clone(),
                        allow_self: *allow_self,
                    },
                    NodeKind::Join {
                        joiner: joiner.clone(),
                        exclude_self: !allow_self && left == right,
                    },
                    self.nodes[left].arity + self.nodes[right].arity,
                    &[(left, Port::Left), (right, Port::Right)],
                ))
            }

            StreamOp::Exists {
                parent,
                other,
                joiner,
                should_exist,
                allow_self,
            } => {
                let parent = self.resolve(parent)?;
                let other = self.resolve(other)?;
                self.check_joiner(joiner, parent, other, def.op_name())?;
                Ok(self.intern(
                    NodeKey::Exists {
                        parent,
                        other,
                        joiner: joiner.clone(),
                        should_exist: *should_exist,
                        allow_self: *allow_self,
                    },
                    NodeKind::Exists {
                        joiner: joiner.clone(),
                        should_exist: *should_exist,
                        exclude_self: !allow_self && parent == other,
                    },
                    self.nodes[parent].arity,
                    &[(parent, Port::Left), (other, Port::Right)],
                ))
            }

            StreamOp::GroupBy {
                parent,
                keys,
                collectors,
            } => {
                if keys.is_empty() && collectors.is_empty() {
                    return Err(BuildError::InvalidStream(
                        "group_by needs at least one key or collector".into(),
                    ));
                }
                let parent = self.resolve(parent)?;
                let input_arity = self.nodes[parent].arity;
                for key in keys {
                    self.check_expr(key, input_arity, || "group_by key".into())?;
                }
                for collector in collectors {
                    for (expr, scope) in collector.exprs() {
                        let arity = match scope {
                            ExprScope::Tuple => input_arity,
                            ExprScope::Element => 1,
                        };
                        self.check_expr(expr, arity, || "collector".into())?;
                    }
                }
                Ok(self.intern(
                    NodeKey::GroupBy {
                        parent,
                        keys: keys.clone(),
                        collectors: collectors.clone(),
                    },
                    NodeKind::GroupBy {
                        keys: keys.clone(),
                        collectors: collectors.clone(),
                    },
                    keys.len() + collectors.len(),
                    &[(parent, Port::Single)],
                ))
            }

            StreamOp::Map { parent, mappings } => {
                if mappings.is_empty() {
                    return Err(BuildError::InvalidStream(
                        "map needs at least one mapping".into(),
                    ));
                }
                let parent = self.resolve(parent)?;
                for mapping in mappings {
                    self.check_expr(mapping, self.nodes[parent].arity, || "map".into())?;
                }
                Ok(self.intern(
                    NodeKey::Map {
                        parent,
                        mappings: mappings.clone(),
                    },
                    NodeKind::Map {
                        mappings: mappings.clone(),
                    },
                    mappings.len(),
                    &[(parent, Port::Single)],
                ))
            }

            StreamOp::FlattenLast { parent } => {
                let parent = self.resolve(parent)?;
                let arity = self.nodes[parent].arity;
                Ok(self.intern(
                    NodeKey::FlattenLast { parent },
                    NodeKind::FlattenLast,
                    arity,
                    &[(parent, Port::Single)],
                ))
            }
        }
    }

    fn intern(
        &mut self,
        key: NodeKey,
        kind: NodeKind<Sc>,
        arity: usize,
        parents: &[(NodeId, Port)],
    ) -> NodeId {
        if let Some(&id) = self.cache.get(&key) {
            self.shared_count += 1;
            return id;
        }
        let id = self.push(kind, arity, parents);
        self.cache.insert(key, id);
        id
    }

    fn push(&mut self, kind: NodeKind<Sc>, arity: usize, parents: &[(NodeId, Port)]) -> NodeId {
        let id = self.nodes.len();
        let layer = parents
            .iter()
            .map(|(p, _)| self.nodes[*p].layer + 1)
            .max()
            .unwrap_or(0);
        let mut input_slots = Vec::with_capacity(parents.len());
        for (parent, port) in parents {
            let children = &mut self.nodes[*parent].children;
            input_slots.push(children.len());
            children.push(Edge {
                child: id,
                port: *port,
            });
        }
        self.nodes.push(NodeDef {
            kind,
            layer,
            arity,
            parents: parents.iter().map(|(p, _)| *p).collect(),
            input_slots,
            children: Vec::new(),
        });
        id
    }

    fn check_joiner(
        &self,
        joiner: &Joiner,
        left: NodeId,
        right: NodeId,
        context: &str,
    ) -> BuildResult<()> {
        let left_arity = self.nodes[left].arity;
        let right_arity = self.nodes[right].arity;
        for expr in joiner.left_exprs() {
            self.check_expr(expr, left_arity, || format!("{} left side", context))?;
        }
        for expr in joiner.right_exprs() {
            self.check_expr(expr, right_arity, || format!("{} right side", context))?;
        }
        for expr in joiner.joined_exprs() {
            self.check_expr(expr, left_arity + right_arity, || {
                format!("{} filtering", context)
            })?;
        }
        Ok(())
    }

    fn check_expr(
        &self,
        expr: &Expr,
        arity: usize,
        context: impl FnOnce() -> String,
    ) -> BuildResult<()> {
        if let Some(param) = expr.max_param() {
            if param >= arity {
                return Err(BuildError::ArityMismatch {
                    context: context(),
                    param,
                    arity,
                });
            }
        }
        for name in expr.function_names() {
            if !self.functions.contains(name) {
                return Err(BuildError::UnknownFunction(name.to_string()));
            }
        }
        Ok(())
    }
}
