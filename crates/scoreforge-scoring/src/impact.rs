//! Score impacters and the running score total.
//!
//! Every terminal node owns a [`WeightedScoreImpacter`]. On each match it
//! multiplies the constraint weight by the match weight, adds the product to
//! the [`ScoreInliner`], and hands back an [`UndoScoreImpact`] that the node
//! stores on the matched tuple until the match goes away.

use std::fmt;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use scoreforge_core::{ConstraintRef, ImpactType, Score, Value};

use crate::analysis::{ConstraintMatch, ConstraintMatchTotal};
use crate::error::{ScoreError, ScoreResult};

/// Numeric kind of the match weights an impacter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImpactKind {
    Int,
    Long,
    Decimal,
}

impl fmt::Display for ImpactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImpactKind::Int => "int",
            ImpactKind::Long => "long",
            ImpactKind::Decimal => "decimal",
        })
    }
}

/// Record of one applied impact. Consuming it through
/// [`ScoreInliner::undo`] subtracts exactly the applied delta.
#[derive(Debug)]
pub struct UndoScoreImpact<Sc: Score> {
    constraint: usize,
    delta: Sc,
    match_id: Option<u64>,
}

impl<Sc: Score> UndoScoreImpact<Sc> {
    /// Score delta that was applied.
    pub fn delta(&self) -> Sc {
        self.delta
    }

    pub fn constraint(&self) -> usize {
        self.constraint
    }
}

#[derive(Debug)]
struct ConstraintTotal<Sc: Score> {
    constraint_ref: ConstraintRef,
    weight: Sc,
    score: Sc,
    match_count: usize,
    matches: IndexMap<u64, (Vec<Value>, Sc)>,
}

/// Per-constraint running totals plus the overall score.
#[derive(Debug)]
pub struct ScoreInliner<Sc: Score> {
    totals: Vec<ConstraintTotal<Sc>>,
    score: Sc,
    track_matches: bool,
    next_match_id: u64,
}

impl<Sc: Score> ScoreInliner<Sc> {
    /// Creates an inliner for constraints given as `(ref, weight)` in index order.
    pub fn new(
        constraints: impl IntoIterator<Item = (ConstraintRef, Sc)>,
        track_matches: bool,
    ) -> Self {
        let totals = constraints
            .into_iter()
            .map(|(constraint_ref, weight)| ConstraintTotal {
                constraint_ref,
                weight,
                score: Sc::zero(),
                match_count: 0,
                matches: IndexMap::new(),
            })
            .collect();
        Self {
            totals,
            score: Sc::zero(),
            track_matches,
            next_match_id: 0,
        }
    }

    /// Adds `delta` to constraint `constraint`.
    ///
    /// `justification` is only evaluated when match tracking is on. Nothing
    /// changes when either total would overflow.
    pub fn impact(
        &mut self,
        constraint: usize,
        delta: Sc,
        justification: impl FnOnce() -> Vec<Value>,
    ) -> ScoreResult<UndoScoreImpact<Sc>> {
        let total = &mut self.totals[constraint];
        let (constraint_score, score) = total
            .score
            .checked_add(&delta)
            .zip(self.score.checked_add(&delta))
            .ok_or_else(|| ScoreError::ScoreOverflow {
                constraint: total.constraint_ref.full_name(),
            })?;
        total.score = constraint_score;
        total.match_count += 1;
        self.score = score;
        let match_id = if self.track_matches {
            let id = self.next_match_id;
            self.next_match_id += 1;
            total.matches.insert(id, (justification(), delta));
            Some(id)
        } else {
            None
        };
        Ok(UndoScoreImpact {
            constraint,
            delta,
            match_id,
        })
    }

    /// Reverts an impact.
    pub fn undo(&mut self, undo: UndoScoreImpact<Sc>) -> ScoreResult<()> {
        let total = &mut self.totals[undo.constraint];
        if let Some(id) = undo.match_id {
            if !total.matches.contains_key(&id) {
                return Err(ScoreError::UndoTwice(id));
            }
        }
        let (constraint_score, score) = total
            .score
            .checked_sub(&undo.delta)
            .zip(self.score.checked_sub(&undo.delta))
            .ok_or_else(|| ScoreError::ScoreOverflow {
                constraint: total.constraint_ref.full_name(),
            })?;
        if let Some(id) = undo.match_id {
            total.matches.shift_remove(&id);
        }
        total.score = constraint_score;
        total.match_count -= 1;
        self.score = score;
        Ok(())
    }

    pub fn score(&self) -> Sc {
        self.score
    }

    pub fn constraint_ref(&self, constraint: usize) -> &ConstraintRef {
        &self.totals[constraint].constraint_ref
    }

    pub fn constraint_weight(&self, constraint: usize) -> Sc {
        self.totals[constraint].weight
    }

    pub fn constraint_score(&self, constraint: usize) -> Sc {
        self.totals[constraint].score
    }

    pub fn match_count(&self, constraint: usize) -> usize {
        self.totals[constraint].match_count
    }

    pub fn constraint_count(&self) -> usize {
        self.totals.len()
    }

    pub fn is_tracking_matches(&self) -> bool {
        self.track_matches
    }

    /// Snapshot of every constraint's total and matches, in constraint order.
    pub fn constraint_match_totals(&self) -> ScoreResult<Vec<ConstraintMatchTotal<Sc>>> {
        if !self.track_matches {
            return Err(ScoreError::ConstraintMatchDisabled);
        }
        Ok(self
            .totals
            .iter()
            .map(|total| ConstraintMatchTotal {
                constraint_ref: total.constraint_ref.clone(),
                constraint_weight: total.weight,
                score: total.score,
                matches: total
                    .matches
                    .values()
                    .map(|(justification, score)| ConstraintMatch {
                        constraint_ref: total.constraint_ref.clone(),
                        justification: justification.clone(),
                        score: *score,
                    })
                    .collect(),
            })
            .collect())
    }
}

/// Turns match weights into score deltas for one constraint.
#[derive(Debug, Clone)]
pub struct WeightedScoreImpacter<Sc: Score> {
    constraint: usize,
    impact_type: ImpactType,
    kind: ImpactKind,
    weight: Sc,
}

impl<Sc: Score> WeightedScoreImpacter<Sc> {
    pub fn new(constraint: usize, impact_type: ImpactType, kind: ImpactKind, weight: Sc) -> Self {
        Self {
            constraint,
            impact_type,
            kind,
            weight,
        }
    }

    pub fn kind(&self) -> ImpactKind {
        self.kind
    }

    pub fn impact_int(
        &self,
        inliner: &mut ScoreInliner<Sc>,
        match_weight: i32,
        justification: impl FnOnce() -> Vec<Value>,
    ) -> ScoreResult<UndoScoreImpact<Sc>> {
        self.expect_kind(inliner, ImpactKind::Int)?;
        self.assert_sign(inliner, match_weight < 0, &match_weight)?;
        let base = self.weight.multiply_long(i64::from(match_weight));
        self.apply(inliner, base, &match_weight, justification)
    }

    pub fn impact_long(
        &self,
        inliner: &mut ScoreInliner<Sc>,
        match_weight: i64,
        justification: impl FnOnce() -> Vec<Value>,
    ) -> ScoreResult<UndoScoreImpact<Sc>> {
        self.expect_kind(inliner, ImpactKind::Long)?;
        self.assert_sign(inliner, match_weight < 0, &match_weight)?;
        let base = self.weight.multiply_long(match_weight);
        self.apply(inliner, base, &match_weight, justification)
    }

    pub fn impact_decimal(
        &self,
        inliner: &mut ScoreInliner<Sc>,
        match_weight: Decimal,
        justification: impl FnOnce() -> Vec<Value>,
    ) -> ScoreResult<UndoScoreImpact<Sc>> {
        self.expect_kind(inliner, ImpactKind::Decimal)?;
        self.assert_sign(inliner, match_weight < Decimal::ZERO, &match_weight)?;
        let base = self.weight.multiply_decimal(match_weight);
        self.apply(inliner, base, &match_weight, justification)
    }

    /// Dispatches on the runtime kind of an evaluated match weight.
    pub fn impact_value(
        &self,
        inliner: &mut ScoreInliner<Sc>,
        match_weight: &Value,
        justification: impl FnOnce() -> Vec<Value>,
    ) -> ScoreResult<UndoScoreImpact<Sc>> {
        match match_weight {
            Value::Int(w) => self.impact_int(inliner, *w, justification),
            Value::Long(w) => self.impact_long(inliner, *w, justification),
            Value::Decimal(w) => self.impact_decimal(inliner, *w, justification),
            other => Err(ScoreError::TypeMismatch {
                context: "match weight",
                expected: match self.kind {
                    ImpactKind::Int => "int",
                    ImpactKind::Long => "long",
                    ImpactKind::Decimal => "decimal",
                },
                actual: other.kind(),
            }),
        }
    }

    fn expect_kind(&self, inliner: &ScoreInliner<Sc>, actual: ImpactKind) -> ScoreResult<()> {
        if self.kind == actual {
            Ok(())
        } else {
            Err(ScoreError::WrongImpactType {
                constraint: inliner.constraint_ref(self.constraint).full_name(),
                expected: self.kind,
                actual,
            })
        }
    }

    fn assert_sign(
        &self,
        inliner: &ScoreInliner<Sc>,
        negative: bool,
        match_weight: &dyn fmt::Display,
    ) -> ScoreResult<()> {
        if negative && !self.impact_type.accepts_negative_weights() {
            return Err(ScoreError::NegativeWeight {
                constraint: inliner.constraint_ref(self.constraint).full_name(),
                weight: match_weight.to_string(),
            });
        }
        Ok(())
    }

    fn apply(
        &self,
        inliner: &mut ScoreInliner<Sc>,
        base: Option<Sc>,
        match_weight: &dyn fmt::Display,
        justification: impl FnOnce() -> Vec<Value>,
    ) -> ScoreResult<UndoScoreImpact<Sc>> {
        let base = base.ok_or_else(|| ScoreError::WeightNotRepresentable {
            constraint: inliner.constraint_ref(self.constraint).full_name(),
            weight: match_weight.to_string(),
        })?;
        let delta = match self.impact_type {
            ImpactType::Penalty => Sc::zero().checked_sub(&base).ok_or_else(|| {
                ScoreError::WeightNotRepresentable {
                    constraint: inliner.constraint_ref(self.constraint).full_name(),
                    weight: match_weight.to_string(),
                }
            })?,
            ImpactType::Reward | ImpactType::Mixed => base,
        };
        inliner.impact(self.constraint, delta, justification)
    }
}
