//! Incremental constraint sessions.
//!
//! A [`ConstraintSessionFactory`] compiles constraints once; every session it
//! creates shares the compiled network and keeps its own tuples, indices and
//! score totals.
//!
//! ```
//! use scoreforge_core::{Expr, FactKey, SimpleScore, Value};
//! use scoreforge_scoring::function::FunctionRegistry;
//! use scoreforge_scoring::session::ConstraintSessionFactory;
//! use scoreforge_scoring::stream::ConstraintFactory;
//!
//! const PROCESS: usize = 0;
//!
//! let factory = ConstraintFactory::new("demo");
//! let heavy = factory
//!     .for_each(PROCESS)
//!     .filter(Expr::gt(Expr::field(0, 0), Expr::int(10)))
//!     .penalize(SimpleScore::ONE)
//!     .as_constraint("heavy process");
//!
//! let sessions = ConstraintSessionFactory::new(vec![heavy], FunctionRegistry::new()).unwrap();
//! let mut session = sessions.create_session();
//! session.insert(FactKey::new(PROCESS, 1), vec![Value::Int(12)]).unwrap();
//! session.insert(FactKey::new(PROCESS, 2), vec![Value::Int(3)]).unwrap();
//! assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));
//!
//! session.update(FactKey::new(PROCESS, 2), vec![Value::Int(30)]).unwrap();
//! assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-2));
//! ```

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use scoreforge_core::{FactKey, PlanningFact, Score, Value};
use tracing::{info, trace, warn};

use crate::analysis::{ConstraintMatchTotal, ConstraintSummary, IndictmentMap, ScoreExplanation};
use crate::error::{BuildResult, ScoreError, ScoreResult};
use crate::eval::EvalContext;
use crate::facts::FactStore;
use crate::function::FunctionRegistry;
use crate::graph::NodeNetwork;
use crate::impact::ScoreInliner;
use crate::node::{NodeContext, NodeState};
use crate::stream::Constraint;
use crate::tuple::{TupleArena, TupleId, TupleState};
use crate::weight_overrides::ConstraintWeightOverrides;

/// Compiled constraints plus everything needed to open sessions on them.
#[derive(Clone)]
pub struct ConstraintSessionFactory<Sc: Score> {
    network: Arc<NodeNetwork<Sc>>,
    functions: Arc<FunctionRegistry>,
    constraint_match_enabled: bool,
}

impl<Sc: Score> fmt::Debug for ConstraintSessionFactory<Sc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintSessionFactory")
            .field("node_count", &self.network.node_count())
            .field("constraint_count", &self.network.constraints().len())
            .field("constraint_match_enabled", &self.constraint_match_enabled)
            .finish()
    }
}

impl<Sc: Score> ConstraintSessionFactory<Sc> {
    pub fn new(constraints: Vec<Constraint<Sc>>, functions: FunctionRegistry) -> BuildResult<Self> {
        Self::with_weight_overrides(constraints, functions, &ConstraintWeightOverrides::new())
    }

    /// Builds with constraint weights replaced by `overrides`.
    pub fn with_weight_overrides(
        constraints: Vec<Constraint<Sc>>,
        functions: FunctionRegistry,
        overrides: &ConstraintWeightOverrides<Sc>,
    ) -> BuildResult<Self> {
        let constraints: Vec<_> = constraints
            .into_iter()
            .map(|c| overrides.apply(c))
            .collect();
        let network = NodeNetwork::build(&constraints, &functions)?;
        Ok(Self {
            network,
            functions: Arc::new(functions),
            constraint_match_enabled: true,
        })
    }

    /// Turns match tracking on or off for sessions created afterwards.
    pub fn with_constraint_match(mut self, enabled: bool) -> Self {
        self.constraint_match_enabled = enabled;
        self
    }

    pub fn is_constraint_match_enabled(&self) -> bool {
        self.constraint_match_enabled
    }

    pub fn network(&self) -> &Arc<NodeNetwork<Sc>> {
        &self.network
    }

    pub fn functions(&self) -> &Arc<FunctionRegistry> {
        &self.functions
    }

    pub fn create_session(&self) -> ConstraintSession<Sc> {
        info!(
            event = "session_created",
            node_count = self.network.node_count(),
            constraint_count = self.network.constraints().len(),
            constraint_match_enabled = self.constraint_match_enabled,
        );
        ConstraintSession::new(
            self.network.clone(),
            self.functions.clone(),
            self.constraint_match_enabled,
        )
    }
}

/// Incremental score state over a set of facts.
///
/// Changes are buffered until [`ConstraintSession::calculate_score`] flushes
/// them. Any error raised by a flush poisons the session.
pub struct ConstraintSession<Sc: Score> {
    network: Arc<NodeNetwork<Sc>>,
    functions: Arc<FunctionRegistry>,
    facts: FactStore,
    arena: TupleArena<Sc>,
    nodes: Vec<NodeState<Sc>>,
    queues: Vec<Vec<TupleId>>,
    inliner: ScoreInliner<Sc>,
    dirty: bool,
    poisoned: bool,
}

impl<Sc: Score> fmt::Debug for ConstraintSession<Sc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintSession")
            .field("facts", &self.facts.len())
            .field("tuples", &self.arena.len())
            .field("score", &self.inliner.score())
            .field("dirty", &self.dirty)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

impl<Sc: Score> ConstraintSession<Sc> {
    fn new(
        network: Arc<NodeNetwork<Sc>>,
        functions: Arc<FunctionRegistry>,
        track_matches: bool,
    ) -> Self {
        let nodes = network
            .nodes()
            .iter()
            .enumerate()
            .map(|(id, def)| NodeState::new(id, def))
            .collect();
        let inliner = ScoreInliner::new(network.constraints().iter().cloned(), track_matches);
        Self {
            queues: vec![Vec::new(); network.node_count()],
            network,
            functions,
            facts: FactStore::new(),
            arena: TupleArena::new(),
            nodes,
            inliner,
            dirty: false,
            poisoned: false,
        }
    }

    fn check_poisoned(&self) -> ScoreResult<()> {
        if self.poisoned {
            Err(ScoreError::Poisoned)
        } else {
            Ok(())
        }
    }

    fn poison<T>(&mut self, result: ScoreResult<T>) -> ScoreResult<T> {
        if let Err(error) = &result {
            warn!(event = "session_poisoned", error = %error);
            self.poisoned = true;
        }
        result
    }

    /// Adds a fact with a snapshot of its field values.
    pub fn insert(&mut self, key: FactKey, fields: Vec<Value>) -> ScoreResult<()> {
        self.check_poisoned()?;
        self.facts.insert(key, fields)?;
        let result = self.insert_roots(key);
        self.dirty = true;
        self.poison(result)
    }

    fn insert_roots(&mut self, key: FactKey) -> ScoreResult<()> {
        for &root in self.network.roots_for(key.class) {
            let slot_count = self.network.edge_count(root);
            if let Some(node) = self.nodes[root].as_for_each() {
                node.insert_fact(&mut self.arena, &mut self.queues[root], key, slot_count)?;
            }
        }
        Ok(())
    }

    /// Replaces the field snapshot of a known fact.
    pub fn update(&mut self, key: FactKey, fields: Vec<Value>) -> ScoreResult<()> {
        self.check_poisoned()?;
        self.facts.update(key, fields)?;
        let mut result = Ok(());
        for &root in self.network.roots_for(key.class) {
            if let Some(node) = self.nodes[root].as_for_each() {
                result = node.update_fact(&mut self.arena, &mut self.queues[root], key);
                if result.is_err() {
                    break;
                }
            }
        }
        self.dirty = true;
        self.poison(result)
    }

    pub fn retract(&mut self, key: FactKey) -> ScoreResult<()> {
        self.check_poisoned()?;
        self.facts.retract(key)?;
        let mut result = Ok(());
        for &root in self.network.roots_for(key.class) {
            if let Some(node) = self.nodes[root].as_for_each() {
                result = node.retract_fact(&mut self.arena, &mut self.queues[root], key);
                if result.is_err() {
                    break;
                }
            }
        }
        self.dirty = true;
        self.poison(result)
    }

    pub fn insert_fact(&mut self, fact: &dyn PlanningFact) -> ScoreResult<()> {
        self.insert(fact.fact_key(), fact.field_values())
    }

    /// Re-reads every field of `fact`.
    pub fn update_fact(&mut self, fact: &dyn PlanningFact) -> ScoreResult<()> {
        self.update(fact.fact_key(), fact.field_values())
    }

    pub fn contains(&self, key: FactKey) -> bool {
        self.facts.contains(key)
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Flushes pending changes and returns the score.
    pub fn calculate_score(&mut self) -> ScoreResult<Sc> {
        self.check_poisoned()?;
        if self.dirty {
            let result = self.flush();
            self.poison(result)?;
        }
        Ok(self.inliner.score())
    }

    /// Score as of the last flush.
    pub fn working_score(&self) -> Sc {
        self.inliner.score()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn is_constraint_match_enabled(&self) -> bool {
        self.inliner.is_tracking_matches()
    }

    pub fn network(&self) -> &Arc<NodeNetwork<Sc>> {
        &self.network
    }

    /// Number of live tuples across all nodes.
    pub fn tuple_count(&self) -> usize {
        self.arena.len()
    }

    /// Flushes, then snapshots every constraint's matches.
    pub fn constraint_match_totals(&mut self) -> ScoreResult<Vec<ConstraintMatchTotal<Sc>>> {
        self.calculate_score()?;
        self.inliner.constraint_match_totals()
    }

    pub fn indictments(&mut self) -> ScoreResult<IndictmentMap<Sc>> {
        let totals = self.constraint_match_totals()?;
        Ok(IndictmentMap::from_match_totals(&totals))
    }

    /// Score broken down per constraint. Match details are included when
    /// tracking is on.
    pub fn explain(&mut self) -> ScoreResult<ScoreExplanation<Sc>> {
        let score = self.calculate_score()?;
        let constraints = (0..self.inliner.constraint_count())
            .map(|i| ConstraintSummary {
                constraint_ref: self.inliner.constraint_ref(i).clone(),
                constraint_weight: self.inliner.constraint_weight(i),
                score: self.inliner.constraint_score(i),
                match_count: self.inliner.match_count(i),
            })
            .collect();
        let match_totals = if self.inliner.is_tracking_matches() {
            Some(self.inliner.constraint_match_totals()?)
        } else {
            None
        };
        Ok(ScoreExplanation {
            score,
            constraints,
            match_totals,
        })
    }

    /// Lifecycle state of the root tuple of `key` in its first `for_each`
    /// node.
    #[cfg(test)]
    pub(crate) fn root_state(&mut self, key: FactKey) -> Option<TupleState> {
        let root = *self.network.roots_for(key.class).first()?;
        let id = self.nodes[root].as_for_each()?.tuple(key)?;
        Some(self.arena.state(id))
    }

    fn flush(&mut self) -> ScoreResult<()> {
        let network = self.network.clone();
        let mut processed = 0usize;
        let mut propagated = 0usize;

        let mut ctx = NodeContext {
            arena: &mut self.arena,
            queues: &mut self.queues,
            inliner: &mut self.inliner,
            eval: EvalContext::new(&self.facts, &self.functions),
            network: &network,
        };

        for layer in network.layers() {
            for &node in layer {
                self.nodes[node].finalize(&mut ctx)?;

                let queue = std::mem::take(&mut ctx.queues[node]);
                if queue.is_empty() {
                    continue;
                }
                processed += 1;
                propagated += queue.len();

                let mut retracts = Vec::new();
                let mut updates = Vec::new();
                let mut inserts = Vec::new();
                for id in queue {
                    match ctx.arena.state(id) {
                        TupleState::Dying => retracts.push(id),
                        TupleState::Updating => updates.push(id),
                        TupleState::Creating => inserts.push(id),
                        // Retracted before anything downstream saw it.
                        TupleState::Aborting => ctx.arena.settle(id)?,
                        TupleState::Ok | TupleState::Dead => {}
                    }
                }

                let children = &network.nodes()[node].children;
                for (change, ids) in [
                    (Change::Retract, retracts),
                    (Change::Update, updates),
                    (Change::Insert, inserts),
                ] {
                    for id in ids {
                        for (slot, edge) in children.iter().enumerate() {
                            let child = &mut self.nodes[edge.child];
                            match change {
                                Change::Retract => child.retract(&mut ctx, id, slot, edge.port)?,
                                Change::Update => child.update(&mut ctx, id, slot, edge.port)?,
                                Change::Insert => child.insert(&mut ctx, id, slot, edge.port)?,
                            }
                        }
                        ctx.arena.settle(id)?;
                    }
                }
            }
        }

        self.facts.clear_retired();
        self.dirty = false;
        trace!(
            event = "flush",
            nodes_processed = processed,
            tuples_propagated = propagated,
            score = %self.inliner.score(),
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Change {
    Retract,
    Update,
    Insert,
}
