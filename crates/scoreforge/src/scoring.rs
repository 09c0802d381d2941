//! One-call helpers over the session API.

use std::path::Path;

use scoreforge_core::{FactSource, ParseableScore, PlanningFact, Score};
use scoreforge_scoring::analysis::ScoreExplanation;
use scoreforge_scoring::stream::document::{compile_document, ConstraintDocument};
use scoreforge_scoring::{Constraint, ConstraintSessionFactory, FunctionRegistry};
use tracing::info;

use crate::ScoreForgeError;

/// Loads and compiles a constraint document from a `.toml`, `.yaml` or
/// `.yml` file.
pub fn load_constraints<Sc>(path: impl AsRef<Path>) -> Result<Vec<Constraint<Sc>>, ScoreForgeError>
where
    Sc: Score + ParseableScore,
{
    let path = path.as_ref();
    let document = ConstraintDocument::load(path)?;
    let constraints = compile_document(&document)?;
    info!(
        event = "constraints_loaded",
        path = %path.display(),
        package = %document.package,
        constraint_count = constraints.len(),
    );
    Ok(constraints)
}

/// Scores `solution` from scratch and explains the result.
///
/// # Examples
///
/// ```
/// use scoreforge::prelude::*;
/// use scoreforge::score_solution;
///
/// struct Item(i32);
///
/// impl PlanningFact for Item {
///     fn fact_key(&self) -> FactKey { FactKey::new(0, self.0 as usize) }
///     fn field_count(&self) -> usize { 1 }
///     fn field(&self, _: usize) -> Value { Value::Int(self.0) }
/// }
///
/// struct Items(Vec<Item>);
///
/// impl FactSource for Items {
///     fn visit_facts(&self, visitor: &mut dyn FnMut(&dyn PlanningFact)) {
///         self.0.iter().for_each(|i| visitor(i));
///     }
///     fn fact(&self, key: FactKey) -> Option<&dyn PlanningFact> {
///         self.0.iter().find(|i| i.0 as usize == key.id).map(|i| i as &dyn PlanningFact)
///     }
/// }
///
/// let factory = ConstraintFactory::new("example");
/// let odd = factory
///     .for_each(0)
///     .filter(Expr::eq(Expr::modulo(Expr::field(0, 0), Expr::int(2)), Expr::int(1)))
///     .penalize(SimpleScore::ONE)
///     .as_constraint("odd");
///
/// let explanation = score_solution(vec![odd], FunctionRegistry::new(), &Items(vec![Item(1), Item(2), Item(3)]))?;
/// assert_eq!(explanation.score, SimpleScore::of(-2));
/// # Ok::<(), ScoreForgeError>(())
/// ```
pub fn score_solution<S, Sc>(
    constraints: Vec<Constraint<Sc>>,
    functions: FunctionRegistry,
    solution: &S,
) -> Result<ScoreExplanation<Sc>, ScoreForgeError>
where
    S: FactSource + ?Sized,
    Sc: Score,
{
    let factory = ConstraintSessionFactory::new(constraints, functions)?;
    let mut session = factory.create_session();
    let mut result = Ok(());
    solution.visit_facts(&mut |fact: &dyn PlanningFact| {
        if result.is_ok() {
            result = session.insert_fact(fact);
        }
    });
    result?;
    Ok(session.explain()?)
}

#[cfg(test)]
mod tests {
    use scoreforge_core::{Expr, HardSoftScore};
    use scoreforge_scoring::joiner::equal_bi;
    use scoreforge_scoring::stream::ConstraintFactory;
    use scoreforge_test::cloud::{CloudBalance, COMPUTER, PROCESS};
    use tempfile::TempDir;

    use super::*;

    const DOCUMENT: &str = r#"
package = "cloud"

[streams.processes]
op = "for_each"
class = 1

[streams.unassigned]
op = "filter"
source = "processes"
predicate = { is_none = { field = { base = { param = 0 }, field = 2 } } }

[[constraints]]
name = "unassigned"
stream = "unassigned"
impact = "penalty"
weight = "1hard/0soft"
"#;

    fn write_document(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_constraints_and_score() {
        let dir = TempDir::new().unwrap();
        let path = write_document(&dir, "constraints.toml", DOCUMENT);
        let constraints = load_constraints::<HardSoftScore>(&path).unwrap();
        assert_eq!(constraints.len(), 1);

        let mut solution = CloudBalance::generate(2, 3, 11);
        solution.assign(0, Some(1));
        let explanation =
            score_solution(constraints, FunctionRegistry::new(), &solution).unwrap();
        assert_eq!(explanation.score, HardSoftScore::of(-2, 0));
    }

    #[test]
    fn test_errors_convert_to_umbrella() {
        let dir = TempDir::new().unwrap();
        let path = write_document(&dir, "broken.toml", "constraints = 5");
        let err = load_constraints::<HardSoftScore>(&path).unwrap_err();
        assert!(matches!(err, ScoreForgeError::Build(_)));
        assert!(err.is_configuration());

        let factory = ConstraintFactory::new("cloud");
        let weighted = factory
            .for_each(COMPUTER)
            .if_exists(PROCESS, equal_bi(Expr::param(0), Expr::field(0, 2)))
            .penalize(HardSoftScore::ONE_SOFT)
            .with_match_weight(-Expr::field(0, 2))
            .as_constraint("negative cost");
        let mut solution = CloudBalance::generate(1, 1, 3);
        solution.assign(0, Some(0));
        let err = score_solution(vec![weighted], FunctionRegistry::new(), &solution).unwrap_err();
        assert!(matches!(err, ScoreForgeError::Score(_)));
        assert!(!err.is_configuration());
    }
}
