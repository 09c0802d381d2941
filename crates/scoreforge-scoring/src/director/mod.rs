//! Score director: keeps a session in step with a user's solution.
//!
//! The caller brackets every change to the solution with a `before_*` /
//! `after_*` pair naming the fact it touches. The director re-reads the fact
//! through [`FactSource`] on the `after_*` call and forwards the change to its
//! [`ConstraintSession`].
//!
//! ```
//! use scoreforge_core::{Expr, FactKey, FactSource, PlanningFact, SimpleScore, Value};
//! use scoreforge_scoring::director::ScoreDirector;
//! use scoreforge_scoring::function::FunctionRegistry;
//! use scoreforge_scoring::session::ConstraintSessionFactory;
//! use scoreforge_scoring::stream::ConstraintFactory;
//!
//! struct Queen { id: usize, row: i32 }
//!
//! impl PlanningFact for Queen {
//!     fn fact_key(&self) -> FactKey { FactKey::new(0, self.id) }
//!     fn field_count(&self) -> usize { 1 }
//!     fn field(&self, _: usize) -> Value { Value::Int(self.row) }
//! }
//!
//! struct Board(Vec<Queen>);
//!
//! impl FactSource for Board {
//!     fn visit_facts(&self, visitor: &mut dyn FnMut(&dyn PlanningFact)) {
//!         self.0.iter().for_each(|q| visitor(q));
//!     }
//!     fn fact(&self, key: FactKey) -> Option<&dyn PlanningFact> {
//!         self.0.get(key.id).map(|q| q as &dyn PlanningFact)
//!     }
//! }
//!
//! let factory = ConstraintFactory::new("queens");
//! let queens = factory.for_each(0);
//! let conflict = queens
//!     .join(&queens, scoreforge_scoring::joiner::equal(Expr::field(0, 0)))
//!     .penalize(SimpleScore::ONE)
//!     .as_constraint("row conflict");
//! let sessions = ConstraintSessionFactory::new(vec![conflict], FunctionRegistry::new()).unwrap();
//!
//! let board = Board(vec![Queen { id: 0, row: 0 }, Queen { id: 1, row: 0 }]);
//! let mut director = ScoreDirector::new(sessions, board).unwrap();
//! // Both orderings of the pair match.
//! assert_eq!(director.calculate_score().unwrap(), SimpleScore::of(-2));
//!
//! let key = FactKey::new(0, 1);
//! director.before_variable_changed(key).unwrap();
//! director.solution_mut().0[1].row = 1;
//! director.after_variable_changed(key).unwrap();
//! assert_eq!(director.calculate_score().unwrap(), SimpleScore::ZERO);
//! ```


use std::fmt;

use scoreforge_config::DirectorConfig;
use scoreforge_core::{FactKey, Score};
use tracing::{debug, warn};

use crate::analysis::{ConstraintMatchTotal, IndictmentMap, ScoreCorruption, ScoreExplanation};
use crate::error::{ScoreError, ScoreResult};
use crate::session::{ConstraintSession, ConstraintSessionFactory};

pub use scoreforge_core::{FactSource, PlanningFact};

/// Kind of change announced by a `before_*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    EntityAdded,
    EntityRemoved,
    VariableChanged,
    ListVariableChanged { from: usize, to: usize },
    ProblemFactAdded,
    ProblemFactRemoved,
    ProblemPropertyChanged,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::EntityAdded => f.write_str("entity added"),
            Notification::EntityRemoved => f.write_str("entity removed"),
            Notification::VariableChanged => f.write_str("variable changed"),
            Notification::ListVariableChanged { from, to } => {
                write!(f, "list variable changed [{}..{})", from, to)
            }
            Notification::ProblemFactAdded => f.write_str("problem fact added"),
            Notification::ProblemFactRemoved => f.write_str("problem fact removed"),
            Notification::ProblemPropertyChanged => f.write_str("problem property changed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    notification: Notification,
    key: FactKey,
}

/// Incremental score director over a solution `S`.
pub struct ScoreDirector<S: FactSource, Sc: Score> {
    factory: ConstraintSessionFactory<Sc>,
    session: ConstraintSession<Sc>,
    solution: S,
    config: DirectorConfig,
    pending: Option<Pending>,
    last_action: Option<String>,
    calculation_count: u64,
}

impl<S: FactSource, Sc: Score> fmt::Debug for ScoreDirector<S, Sc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoreDirector")
            .field("session", &self.session)
            .field("environment_mode", &self.config.environment_mode)
            .field("pending", &self.pending)
            .field("calculation_count", &self.calculation_count)
            .finish()
    }
}

impl<S: FactSource, Sc: Score> ScoreDirector<S, Sc> {
    /// Creates a director with the default configuration and inserts every
    /// fact of `solution`.
    pub fn new(factory: ConstraintSessionFactory<Sc>, solution: S) -> ScoreResult<Self> {
        Self::with_config(factory, solution, DirectorConfig::default())
    }

    pub fn with_config(
        factory: ConstraintSessionFactory<Sc>,
        solution: S,
        config: DirectorConfig,
    ) -> ScoreResult<Self> {
        let factory = match config.constraint_match_enabled {
            Some(enabled) => factory.with_constraint_match(enabled),
            None => factory,
        };
        let session = seed(&factory, &solution)?;
        debug!(
            event = "director_created",
            fact_count = session.fact_count(),
            environment_mode = ?config.environment_mode,
        );
        Ok(Self {
            factory,
            session,
            solution,
            config,
            pending: None,
            last_action: None,
            calculation_count: 0,
        })
    }

    pub fn solution(&self) -> &S {
        &self.solution
    }

    /// Mutable access for the changes bracketed by notifications.
    pub fn solution_mut(&mut self) -> &mut S {
        &mut self.solution
    }

    pub fn into_solution(self) -> S {
        self.solution
    }

    pub fn session(&self) -> &ConstraintSession<Sc> {
        &self.session
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    /// Number of score calculations so far.
    pub fn calculation_count(&self) -> u64 {
        self.calculation_count
    }

    fn before(&mut self, notification: Notification, key: FactKey) -> ScoreResult<()> {
        if let Some(pending) = self.pending {
            return Err(ScoreError::UnpairedNotification {
                fact: key,
                message: format!(
                    "before {} while {} on {} is still open",
                    notification, pending.notification, pending.key
                ),
            });
        }
        self.pending = Some(Pending { notification, key });
        Ok(())
    }

    fn after(&mut self, notification: Notification, key: FactKey) -> ScoreResult<()> {
        let expected = Pending { notification, key };
        match self.pending {
            Some(pending) if pending == expected => {
                self.pending = None;
                self.last_action = Some(format!("{} on {}", notification, key));
                Ok(())
            }
            Some(pending) => Err(ScoreError::UnpairedNotification {
                fact: key,
                message: format!(
                    "after {} does not match before {} on {}",
                    notification, pending.notification, pending.key
                ),
            }),
            None => Err(ScoreError::UnpairedNotification {
                fact: key,
                message: format!("after {} without a before call", notification),
            }),
        }
    }

    fn insert_from_solution(&mut self, key: FactKey) -> ScoreResult<()> {
        let fact = self.solution.fact(key).ok_or(ScoreError::UnknownFact(key))?;
        self.session.insert(key, fact.field_values())
    }

    fn update_from_solution(&mut self, key: FactKey) -> ScoreResult<()> {
        let fact = self.solution.fact(key).ok_or(ScoreError::UnknownFact(key))?;
        self.session.update(key, fact.field_values())
    }

    pub fn before_entity_added(&mut self, key: FactKey) -> ScoreResult<()> {
        self.before(Notification::EntityAdded, key)
    }

    pub fn after_entity_added(&mut self, key: FactKey) -> ScoreResult<()> {
        self.after(Notification::EntityAdded, key)?;
        self.insert_from_solution(key)
    }

    pub fn before_entity_removed(&mut self, key: FactKey) -> ScoreResult<()> {
        self.before(Notification::EntityRemoved, key)
    }

    pub fn after_entity_removed(&mut self, key: FactKey) -> ScoreResult<()> {
        self.after(Notification::EntityRemoved, key)?;
        self.session.retract(key)
    }

    pub fn before_variable_changed(&mut self, key: FactKey) -> ScoreResult<()> {
        self.before(Notification::VariableChanged, key)
    }

    pub fn after_variable_changed(&mut self, key: FactKey) -> ScoreResult<()> {
        self.after(Notification::VariableChanged, key)?;
        self.update_from_solution(key)
    }

    /// Elements `from..to` of a list variable on `key` are about to change.
    pub fn before_list_variable_changed(
        &mut self,
        key: FactKey,
        from: usize,
        to: usize,
    ) -> ScoreResult<()> {
        self.before(Notification::ListVariableChanged { from, to }, key)
    }

    pub fn after_list_variable_changed(
        &mut self,
        key: FactKey,
        from: usize,
        to: usize,
    ) -> ScoreResult<()> {
        self.after(Notification::ListVariableChanged { from, to }, key)?;
        self.update_from_solution(key)
    }

    pub fn before_problem_fact_added(&mut self, key: FactKey) -> ScoreResult<()> {
        self.before(Notification::ProblemFactAdded, key)
    }

    pub fn after_problem_fact_added(&mut self, key: FactKey) -> ScoreResult<()> {
        self.after(Notification::ProblemFactAdded, key)?;
        self.insert_from_solution(key)
    }

    pub fn before_problem_fact_removed(&mut self, key: FactKey) -> ScoreResult<()> {
        self.before(Notification::ProblemFactRemoved, key)
    }

    pub fn after_problem_fact_removed(&mut self, key: FactKey) -> ScoreResult<()> {
        self.after(Notification::ProblemFactRemoved, key)?;
        self.session.retract(key)
    }

    pub fn before_problem_property_changed(&mut self, key: FactKey) -> ScoreResult<()> {
        self.before(Notification::ProblemPropertyChanged, key)
    }

    pub fn after_problem_property_changed(&mut self, key: FactKey) -> ScoreResult<()> {
        self.after(Notification::ProblemPropertyChanged, key)?;
        self.update_from_solution(key)
    }

    fn check_no_pending(&self) -> ScoreResult<()> {
        match self.pending {
            None => Ok(()),
            Some(pending) => Err(ScoreError::UnpairedNotification {
                fact: pending.key,
                message: format!("before {} was never closed", pending.notification),
            }),
        }
    }

    /// Flushes pending changes and returns the score.
    ///
    /// In an asserting environment mode the result is also checked against a
    /// from-scratch session.
    pub fn calculate_score(&mut self) -> ScoreResult<Sc> {
        self.check_no_pending()?;
        let score = self.session.calculate_score()?;
        self.calculation_count += 1;
        if self.config.should_assert(self.calculation_count) {
            self.assert_working_score_from_scratch()?;
        }
        Ok(score)
    }

    /// Rebuilds a fresh session over the current solution and compares its
    /// score with the working one.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreError::Corruption`] with the excess and missing matches
    /// when the two scores differ.
    pub fn assert_working_score_from_scratch(&mut self) -> ScoreResult<Sc> {
        self.check_no_pending()?;
        let working_score = self.session.calculate_score()?;
        let mut fresh = seed(&self.factory.clone().with_constraint_match(true), &self.solution)?;
        let uncorrupted_score = fresh.calculate_score()?;
        if working_score == uncorrupted_score {
            return Ok(working_score);
        }

        let working = if self.session.is_constraint_match_enabled() {
            Some(self.session.constraint_match_totals()?)
        } else {
            None
        };
        let uncorrupted = fresh.constraint_match_totals()?;
        let corruption = ScoreCorruption::analyze(
            working_score,
            uncorrupted_score,
            working.as_deref(),
            &uncorrupted,
            self.last_action.as_deref(),
        );
        warn!(
            event = "score_corruption",
            working_score = %working_score,
            uncorrupted_score = %uncorrupted_score,
            excess = corruption.excess.len(),
            missing = corruption.missing.len(),
        );
        Err(ScoreError::Corruption(Box::new(corruption)))
    }

    pub fn constraint_match_totals(&mut self) -> ScoreResult<Vec<ConstraintMatchTotal<Sc>>> {
        self.check_no_pending()?;
        self.session.constraint_match_totals()
    }

    pub fn indictments(&mut self) -> ScoreResult<IndictmentMap<Sc>> {
        self.check_no_pending()?;
        self.session.indictments()
    }

    pub fn explain(&mut self) -> ScoreResult<ScoreExplanation<Sc>> {
        self.check_no_pending()?;
        self.session.explain()
    }

    /// Working session, bypassing the solution.
    #[cfg(test)]
    pub(crate) fn session_mut(&mut self) -> &mut ConstraintSession<Sc> {
        &mut self.session
    }
}

fn seed<S: FactSource, Sc: Score>(
    factory: &ConstraintSessionFactory<Sc>,
    solution: &S,
) -> ScoreResult<ConstraintSession<Sc>> {
    let mut session = factory.create_session();
    let mut result = Ok(());
    solution.visit_facts(&mut |fact: &dyn PlanningFact| {
        if result.is_ok() {
            result = session.insert_fact(fact);
        }
    });
    result.map(|()| session)
}
