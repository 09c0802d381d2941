//! Score analysis: constraint matches, indictments, explanations and
//! corruption reports.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use scoreforge_core::{ConstraintRef, FactKey, Score, Value};

/// A single match of a constraint: the tuple that matched and its impact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintMatch<Sc: Score> {
    pub constraint_ref: ConstraintRef,
    /// Elements of the matched tuple.
    pub justification: Vec<Value>,
    pub score: Sc,
}

impl<Sc: Score> ConstraintMatch<Sc> {
    /// Facts referenced by the justification, each once, in tuple order.
    pub fn indicted_facts(&self) -> Vec<FactKey> {
        let mut facts = Vec::new();
        for value in &self.justification {
            let nested = value.as_list().unwrap_or_default();
            for key in std::iter::once(value)
                .chain(nested)
                .filter_map(Value::as_fact)
            {
                if !facts.contains(&key) {
                    facts.push(key);
                }
            }
        }
        facts
    }
}

impl<Sc: Score> fmt::Display for ConstraintMatch<Sc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/[", self.constraint_ref)?;
        for (i, value) in self.justification.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]={}", self.score.to_short_string())
    }
}

/// All matches of one constraint and their summed score.
#[derive(Debug, Clone)]
pub struct ConstraintMatchTotal<Sc: Score> {
    pub constraint_ref: ConstraintRef,
    /// Score of a single match with match weight 1.
    pub constraint_weight: Sc,
    pub score: Sc,
    pub matches: Vec<ConstraintMatch<Sc>>,
}

impl<Sc: Score> ConstraintMatchTotal<Sc> {
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

/// How a single fact impacts the score.
#[derive(Debug, Clone)]
pub struct Indictment<Sc: Score> {
    pub fact: FactKey,
    pub score: Sc,
    pub matches: Vec<ConstraintMatch<Sc>>,
}

impl<Sc: Score> Indictment<Sc> {
    pub fn new(fact: FactKey) -> Self {
        Self {
            fact,
            score: Sc::zero(),
            matches: Vec::new(),
        }
    }

    pub fn add_match(&mut self, constraint_match: ConstraintMatch<Sc>) {
        self.score = self.score + constraint_match.score;
        self.matches.push(constraint_match);
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Number of distinct constraints this fact participates in.
    pub fn constraint_count(&self) -> usize {
        let mut refs: Vec<&ConstraintRef> = self.matches.iter().map(|m| &m.constraint_ref).collect();
        refs.sort();
        refs.dedup();
        refs.len()
    }
}

/// Indictments keyed by fact, in first-indicted order.
#[derive(Debug, Clone)]
pub struct IndictmentMap<Sc: Score> {
    pub indictments: IndexMap<FactKey, Indictment<Sc>>,
}

impl<Sc: Score> IndictmentMap<Sc> {
    pub fn new() -> Self {
        Self {
            indictments: IndexMap::new(),
        }
    }

    pub fn from_match_totals(totals: &[ConstraintMatchTotal<Sc>]) -> Self {
        let mut map = Self::new();
        for m in totals.iter().flat_map(|t| &t.matches) {
            for fact in m.indicted_facts() {
                map.indictments
                    .entry(fact)
                    .or_insert_with(|| Indictment::new(fact))
                    .add_match(m.clone());
            }
        }
        map
    }

    pub fn get(&self, fact: FactKey) -> Option<&Indictment<Sc>> {
        self.indictments.get(&fact)
    }

    /// Facts sorted by worst score impact first.
    pub fn worst_facts(&self) -> Vec<FactKey> {
        let mut facts: Vec<&Indictment<Sc>> = self.indictments.values().collect();
        facts.sort_by(|a, b| a.score.cmp(&b.score).then(a.fact.cmp(&b.fact)));
        facts.into_iter().map(|i| i.fact).collect()
    }

    pub fn len(&self) -> usize {
        self.indictments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indictments.is_empty()
    }
}

impl<Sc: Score> Default for IndictmentMap<Sc> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-constraint line of a [`ScoreExplanation`].
#[derive(Debug, Clone)]
pub struct ConstraintSummary<Sc: Score> {
    pub constraint_ref: ConstraintRef,
    pub constraint_weight: Sc,
    pub score: Sc,
    pub match_count: usize,
}

/// Score broken down by constraint.
#[derive(Debug, Clone)]
pub struct ScoreExplanation<Sc: Score> {
    pub score: Sc,
    pub constraints: Vec<ConstraintSummary<Sc>>,
    /// Present when the session tracks constraint matches.
    pub match_totals: Option<Vec<ConstraintMatchTotal<Sc>>>,
}

impl<Sc: Score> ScoreExplanation<Sc> {
    pub fn total_match_count(&self) -> usize {
        self.constraints.iter().map(|c| c.match_count).sum()
    }

    /// Constraints with a non-zero score, worst first.
    pub fn non_zero_constraints(&self) -> Vec<&ConstraintSummary<Sc>> {
        let mut constraints: Vec<&ConstraintSummary<Sc>> =
            self.constraints.iter().filter(|c| !c.score.is_zero()).collect();
        constraints.sort_by(|a, b| a.score.cmp(&b.score));
        constraints
    }

    pub fn indictments(&self) -> Option<IndictmentMap<Sc>> {
        self.match_totals
            .as_deref()
            .map(IndictmentMap::from_match_totals)
    }

    /// Human-readable summary, listing at most `limit` matches per constraint.
    pub fn summary(&self, limit: usize) -> String {
        let mut out = format!("Explanation of score ({}):\n", self.score);
        out.push_str("    Constraint matches:\n");
        for summary in self.non_zero_constraints() {
            out.push_str(&format!(
                "        {}: constraint ({}) has {} matches:\n",
                summary.score.to_short_string(),
                summary.constraint_ref.name,
                summary.match_count
            ));
            let matches = self
                .match_totals
                .iter()
                .flatten()
                .filter(|t| t.constraint_ref == summary.constraint_ref)
                .flat_map(|t| &t.matches);
            for m in matches.take(limit) {
                out.push_str(&format!("            {}\n", m));
            }
            if summary.match_count > limit && self.match_totals.is_some() {
                out.push_str("            ...\n");
            }
        }
        out
    }
}

/// Difference between a working score and a from-scratch recalculation.
///
/// Rendered scores and matches are kept as text so the report can travel
/// inside a non-generic error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreCorruption {
    pub working_score: String,
    pub uncorrupted_score: String,
    pub difference: String,
    pub completed_action: Option<String>,
    /// Matches the working session has but a fresh one does not.
    pub excess: Vec<String>,
    /// Matches a fresh session has but the working one does not.
    pub missing: Vec<String>,
    /// False when the working session did not track matches.
    pub analysis_available: bool,
}

impl ScoreCorruption {
    pub fn analyze<Sc: Score>(
        working_score: Sc,
        uncorrupted_score: Sc,
        working: Option<&[ConstraintMatchTotal<Sc>]>,
        uncorrupted: &[ConstraintMatchTotal<Sc>],
        completed_action: Option<&str>,
    ) -> Self {
        let (excess, missing) = match working {
            Some(working) => diff_matches(working, uncorrupted),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            working_score: working_score.to_string(),
            uncorrupted_score: uncorrupted_score.to_string(),
            difference: (working_score - uncorrupted_score).to_short_string(),
            completed_action: completed_action.map(str::to_string),
            excess,
            missing,
            analysis_available: working.is_some(),
        }
    }
}

type MatchKey<Sc> = (ConstraintRef, Vec<Value>, Sc);

fn count_matches<Sc: Score>(totals: &[ConstraintMatchTotal<Sc>]) -> BTreeMap<MatchKey<Sc>, usize> {
    let mut counts = BTreeMap::new();
    for m in totals.iter().flat_map(|t| &t.matches) {
        *counts
            .entry((m.constraint_ref.clone(), m.justification.clone(), m.score))
            .or_insert(0) += 1;
    }
    counts
}

fn diff_matches<Sc: Score>(
    working: &[ConstraintMatchTotal<Sc>],
    uncorrupted: &[ConstraintMatchTotal<Sc>],
) -> (Vec<String>, Vec<String>) {
    let working = count_matches(working);
    let uncorrupted = count_matches(uncorrupted);
    let render = |(constraint_ref, justification, score): &MatchKey<Sc>| {
        ConstraintMatch {
            constraint_ref: constraint_ref.clone(),
            justification: justification.clone(),
            score: *score,
        }
        .to_string()
    };

    let mut excess = Vec::new();
    for (key, count) in &working {
        let expected = uncorrupted.get(key).copied().unwrap_or(0);
        for _ in expected..*count {
            excess.push(render(key));
        }
    }
    let mut missing = Vec::new();
    for (key, count) in &uncorrupted {
        let actual = working.get(key).copied().unwrap_or(0);
        for _ in actual..*count {
            missing.push(render(key));
        }
    }
    (excess, missing)
}

impl fmt::Display for ScoreCorruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Score corruption ({}): the workingScore ({}) is not the uncorruptedScore ({})",
            self.difference, self.working_score, self.uncorrupted_score
        )?;
        if let Some(action) = &self.completed_action {
            write!(f, " after completedAction ({})", action)?;
        }
        f.write_str(":\n")?;
        if !self.analysis_available {
            return f.write_str(
                "  Score corruption analysis could not be generated because constraint matching is disabled.\n",
            );
        }
        f.write_str("Score corruption analysis:\n")?;
        if self.excess.is_empty() && self.missing.is_empty() {
            return f.write_str(
                "  The corrupted score director has the same constraint matches; the corruption is in a score weight or a collector.\n",
            );
        }
        if !self.excess.is_empty() {
            writeln!(
                f,
                "  The corrupted score director has {} constraint match(es) which are in excess (and should not be there):",
                self.excess.len()
            )?;
            for m in &self.excess {
                writeln!(f, "    {}", m)?;
            }
        }
        if !self.missing.is_empty() {
            writeln!(
                f,
                "  The corrupted score director has {} constraint match(es) which are missing:",
                self.missing.len()
            )?;
            for m in &self.missing {
                writeln!(f, "    {}", m)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use scoreforge_core::SimpleScore;

    use super::*;

    fn total(name: &str, matches: Vec<(Vec<Value>, i64)>) -> ConstraintMatchTotal<SimpleScore> {
        let constraint_ref = ConstraintRef::new("", name);
        let matches: Vec<ConstraintMatch<SimpleScore>> = matches
            .into_iter()
            .map(|(justification, score)| ConstraintMatch {
                constraint_ref: constraint_ref.clone(),
                justification,
                score: SimpleScore::of(score),
            })
            .collect();
        ConstraintMatchTotal {
            constraint_ref,
            constraint_weight: SimpleScore::ONE,
            score: SimpleScore::of(matches.iter().map(|m| m.score.score()).sum()),
            matches,
        }
    }

    #[test]
    fn test_indictments_collect_referenced_facts() {
        let a = FactKey::new(0, 1);
        let b = FactKey::new(0, 2);
        let totals = vec![
            total("pair", vec![(vec![Value::Fact(a), Value::Fact(b)], -1)]),
            total("single", vec![(vec![Value::Fact(a)], -2)]),
        ];
        let map = IndictmentMap::from_match_totals(&totals);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(a).unwrap().score, SimpleScore::of(-3));
        assert_eq!(map.get(a).unwrap().constraint_count(), 2);
        assert_eq!(map.get(b).unwrap().match_count(), 1);
        assert_eq!(map.worst_facts(), vec![a, b]);
    }

    #[test]
    fn test_corruption_lists_excess_and_missing() {
        let working = vec![total(
            "c",
            vec![(vec![Value::Int(1)], -1), (vec![Value::Int(2)], -1)],
        )];
        let uncorrupted = vec![total(
            "c",
            vec![(vec![Value::Int(1)], -1), (vec![Value::Int(3)], -1)],
        )];
        let report = ScoreCorruption::analyze(
            SimpleScore::of(-2),
            SimpleScore::of(-2),
            Some(&working),
            &uncorrupted,
            Some("move A"),
        );

        assert_eq!(report.excess, vec!["c/[2]=-1".to_string()]);
        assert_eq!(report.missing, vec!["c/[3]=-1".to_string()]);
        let text = report.to_string();
        assert!(text.contains("after completedAction (move A)"));
        assert!(text.contains("should not be there"));
        assert!(text.contains("are missing"));
    }

    #[test]
    fn test_corruption_without_tracking() {
        let report = ScoreCorruption::analyze(
            SimpleScore::of(-1),
            SimpleScore::of(-3),
            None,
            &[],
            None,
        );
        assert_eq!(report.difference, "2");
        assert!(!report.analysis_available);
        assert!(report.to_string().contains("constraint matching is disabled"));
    }
}
