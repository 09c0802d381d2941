use scoreforge_core::{Expr, HardSoftScore, ImpactType, SimpleScore};

use super::document::{compile_document, ConstraintDocument};
use super::*;
use crate::collector;
use crate::error::BuildError;
use crate::joiner::equal;

const COMPUTER: usize = 0;
const PROCESS: usize = 1;

#[test]
fn test_stream_arities() {
    let factory = ConstraintFactory::new("cloud");
    let processes = factory.for_each(PROCESS);
    let computers = factory.for_each(COMPUTER);

    let pairs = processes.join(&computers, equal(Expr::param(0)));
    assert_eq!(pairs.def().arity(), 2);

    let triples = pairs.join(&computers, crate::joiner::none());
    assert_eq!(triples.def().arity(), 3);

    let grouped = processes.group_by_with(Expr::field(0, 0), collector::count(), collector::sum(Expr::field(0, 1)));
    assert_eq!(grouped.def().arity(), 3);

    let keys = processes.group_by_keys([Expr::field(0, 0), Expr::field(0, 1)]);
    assert_eq!(keys.def().arity(), 2);

    let mapped = pairs.map([Expr::param(1)]);
    assert_eq!(mapped.def().arity(), 1);
    assert_eq!(mapped.flatten_last().def().op_name(), "flatten_last");
}

#[test]
fn test_identical_streams_are_equal_values() {
    let factory = ConstraintFactory::new("cloud");
    let a = factory.for_each(PROCESS).filter(Expr::param(0));
    let b = factory.for_each(PROCESS).filter(Expr::param(0));
    assert_eq!(a.def(), b.def());
    assert_eq!(a.def().parents().len(), 1);
}

#[test]
fn test_constraint_builder() {
    let factory = ConstraintFactory::new("cloud");
    let constraint = factory
        .for_each(PROCESS)
        .impact(SimpleScore::of(2))
        .with_long_match_weight(Expr::field(0, 1))
        .as_constraint_in("other", "balance");

    assert_eq!(constraint.constraint_ref().full_name(), "other/balance");
    assert_eq!(constraint.impact_type(), ImpactType::Mixed);
    assert_eq!(constraint.weight(), SimpleScore::of(2));
    assert_eq!(
        constraint.match_weight(),
        &MatchWeight::Long(Expr::field(0, 1))
    );
    assert_eq!(constraint.with_weight(SimpleScore::of(5)).weight(), SimpleScore::of(5));
}

const DOCUMENT: &str = r#"
package = "cloud"

[streams.processes]
op = "for_each"
class = 1

[streams.assigned]
op = "filter"
source = "processes"
predicate = { not = { is_none = { field = { base = { param = 0 }, field = 0 } } } }

[streams.usage]
op = "group_by"
source = "assigned"
keys = [{ field = { base = { param = 0 }, field = 0 } }]
collectors = [{ sum = { field = { base = { param = 0 }, field = 1 } } }]

[[constraints]]
name = "cpu usage"
stream = "usage"
impact = "penalty"
weight = "0hard/1soft"
match_weight = { int = { param = 1 } }
"#;

#[test]
fn test_compile_toml_document() {
    let document = ConstraintDocument::from_toml_str(DOCUMENT).unwrap();
    let constraints = compile_document::<HardSoftScore>(&document).unwrap();

    assert_eq!(constraints.len(), 1);
    let constraint = &constraints[0];
    assert_eq!(constraint.constraint_ref().full_name(), "cloud/cpu usage");
    assert_eq!(constraint.weight(), HardSoftScore::ONE_SOFT);
    assert_eq!(constraint.stream().arity(), 2);
    assert_eq!(constraint.match_weight(), &MatchWeight::Int(Expr::param(1)));

    let factory = ConstraintFactory::new("cloud");
    let expected = factory
        .for_each(PROCESS)
        .filter(!Expr::is_none(Expr::field(0, 0)))
        .group_by(Expr::field(0, 0), collector::sum(Expr::field(0, 1)));
    assert_eq!(constraint.stream(), expected.def());
}

#[test]
fn test_compile_yaml_document() {
    let yaml = r#"
package: cloud
streams:
  computers:
    op: for_each
    class: 0
  idle:
    op: if_not_exists
    source: computers
    other: processes
    joiner:
      - type: compare
        joiner_type: equal
        left: { param: 0 }
        right: { field: { base: { param: 0 }, field: 0 } }
  processes:
    op: for_each
    class: 1
constraints:
  - name: idle computer
    stream: idle
    impact: reward
    weight: "0hard/3soft"
"#;
    let document = ConstraintDocument::from_yaml_str(yaml).unwrap();
    let constraints = compile_document::<HardSoftScore>(&document).unwrap();
    assert_eq!(constraints[0].impact_type(), ImpactType::Reward);
    match constraints[0].stream().op() {
        StreamOp::Exists { should_exist, .. } => assert!(!should_exist),
        other => panic!("unexpected op {:?}", other),
    }
}

#[test]
fn test_cycle_is_rejected() {
    let toml = r#"
[streams.a]
op = "filter"
source = "b"
predicate = { param = 0 }

[streams.b]
op = "map"
source = "a"
mappings = [{ param = 0 }]
"#;
    let document = ConstraintDocument::from_toml_str(toml).unwrap();
    match compile_document::<SimpleScore>(&document) {
        Err(BuildError::CyclicStream { path }) => assert_eq!(path, vec!["a", "b", "a"]),
        other => panic!("expected a cycle, got {:?}", other.map(|c| c.len())),
    }
}

#[test]
fn test_unknown_stream_and_bad_weight() {
    let mut document = ConstraintDocument::from_toml_str(DOCUMENT).unwrap();
    document.constraints[0].stream = "missing".into();
    assert!(matches!(
        compile_document::<HardSoftScore>(&document),
        Err(BuildError::UnknownStream(name)) if name == "missing"
    ));

    let mut document = ConstraintDocument::from_toml_str(DOCUMENT).unwrap();
    document.constraints[0].weight = "1soft".into();
    assert!(matches!(
        compile_document::<HardSoftScore>(&document),
        Err(BuildError::InvalidWeight { .. })
    ));
}

#[test]
fn test_duplicate_constraint_in_document() {
    let mut document = ConstraintDocument::from_toml_str(DOCUMENT).unwrap();
    let copy = document.constraints[0].clone();
    document.constraints.push(copy);
    assert!(matches!(
        compile_document::<HardSoftScore>(&document),
        Err(BuildError::DuplicateConstraint(_))
    ));
}
