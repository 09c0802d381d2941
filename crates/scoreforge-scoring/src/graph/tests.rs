use scoreforge_core::{Expr, HardSoftDecimalScore, HardSoftScore, SimpleScore};

use super::*;
use crate::collector;
use crate::error::BuildError;
use crate::joiner::{equal, equal_bi};
use crate::stream::ConstraintFactory;

const COMPUTER: usize = 0;
const PROCESS: usize = 1;

fn build(constraints: &[Constraint<HardSoftScore>]) -> BuildResult<Arc<NodeNetwork<HardSoftScore>>> {
    NodeNetwork::build(constraints, &FunctionRegistry::new())
}

#[test]
fn test_identical_filters_are_shared() {
    let factory = ConstraintFactory::new("cloud");
    let assigned = || {
        factory
            .for_each(PROCESS)
            .filter(!Expr::is_none(Expr::field(0, 0)))
    };
    let constraints = vec![
        assigned().penalize(HardSoftScore::ONE_HARD).as_constraint("a"),
        assigned().penalize(HardSoftScore::ONE_SOFT).as_constraint("b"),
    ];
    let network = build(&constraints).unwrap();

    // for_each, one shared filter, two score nodes
    assert_eq!(network.node_count(), 4);
    let filters = network.nodes_named("filter");
    assert_eq!(filters.len(), 1);
    assert_eq!(network.edge_count(filters[0]), 2);
    assert_eq!(network.shared_count(), 2);
    assert_eq!(network.layer_count(), 3);
}

#[test]
fn test_different_predicates_are_not_shared() {
    let factory = ConstraintFactory::new("cloud");
    let processes = factory.for_each(PROCESS);
    let constraints = vec![
        processes
            .filter(Expr::is_none(Expr::field(0, 0)))
            .penalize(HardSoftScore::ONE_SOFT)
            .as_constraint("a"),
        processes
            .filter(Expr::is_none(Expr::field(0, 1)))
            .penalize(HardSoftScore::ONE_SOFT)
            .as_constraint("b"),
    ];
    let network = build(&constraints).unwrap();
    assert_eq!(network.nodes_named("filter").len(), 2);
    assert_eq!(network.nodes_named("for_each").len(), 1);
    assert_eq!(network.roots_for(PROCESS).len(), 1);
    assert!(network.roots_for(COMPUTER).is_empty());
}

#[test]
fn test_self_join_uses_two_edges_from_one_node() {
    let factory = ConstraintFactory::new("cloud");
    let processes = factory.for_each(PROCESS);
    let constraints = vec![processes
        .join(&processes, equal(Expr::field(0, 0)))
        .penalize(HardSoftScore::ONE_SOFT)
        .as_constraint("pairs")];
    let network = build(&constraints).unwrap();

    let root = network.roots_for(PROCESS)[0];
    assert_eq!(network.edge_count(root), 2);
    let join = network.nodes_named("join")[0];
    match &network.node(join).unwrap().kind {
        NodeKind::Join { exclude_self, .. } => assert!(exclude_self),
        other => panic!("unexpected node {:?}", other.name()),
    }
    assert_eq!(network.node(join).unwrap().arity, 2);
}

#[test]
fn test_arity_is_validated() {
    let factory = ConstraintFactory::new("cloud");
    let constraints = vec![factory
        .for_each(PROCESS)
        .filter(Expr::param(1))
        .penalize(HardSoftScore::ONE_SOFT)
        .as_constraint("bad")];
    assert!(matches!(
        build(&constraints),
        Err(BuildError::ArityMismatch { param: 1, arity: 1, .. })
    ));

    // The right side of a joiner only sees the right tuple.
    let processes = factory.for_each(PROCESS);
    let pairs = processes.join(&factory.for_each(COMPUTER), equal_bi(Expr::param(0), Expr::param(1)));
    let constraints = vec![pairs.penalize(HardSoftScore::ONE_SOFT).as_constraint("bad")];
    assert!(matches!(build(&constraints), Err(BuildError::ArityMismatch { .. })));
}

#[test]
fn test_unknown_function_and_duplicates() {
    let factory = ConstraintFactory::new("cloud");
    let call = factory
        .for_each(PROCESS)
        .filter(Expr::call("is_critical", vec![Expr::param(0)]))
        .penalize(HardSoftScore::ONE_SOFT)
        .as_constraint("critical");
    assert!(matches!(
        build(std::slice::from_ref(&call)),
        Err(BuildError::UnknownFunction(name)) if name == "is_critical"
    ));

    let functions = FunctionRegistry::new().with("is_critical", |_| true.into());
    assert!(NodeNetwork::build(std::slice::from_ref(&call), &functions).is_ok());

    let plain = factory
        .for_each(PROCESS)
        .penalize(HardSoftScore::ONE_SOFT)
        .as_constraint("dup");
    assert!(matches!(
        build(&[plain.clone(), plain]),
        Err(BuildError::DuplicateConstraint(_))
    ));
}

#[test]
fn test_group_by_validation() {
    let factory = ConstraintFactory::new("cloud");
    let empty = factory
        .for_each(PROCESS)
        .group_by_collectors::<0>([])
        .penalize(HardSoftScore::ONE_SOFT)
        .as_constraint("empty");
    assert!(matches!(build(&[empty]), Err(BuildError::InvalidStream(_))));

    // Element-scoped expressions only see the collected value.
    let bad = factory
        .for_each(PROCESS)
        .group_by_collector(collector::min_by(Expr::field(0, 1), Expr::param(1)))
        .penalize(HardSoftScore::ONE_SOFT)
        .as_constraint("bad");
    assert!(matches!(build(&[bad]), Err(BuildError::ArityMismatch { .. })));
}

#[test]
fn test_decimal_weight_needs_decimal_score() {
    let factory = ConstraintFactory::new("cloud");
    let simple = factory
        .for_each(PROCESS)
        .penalize(SimpleScore::ONE)
        .with_decimal_match_weight(Expr::field(0, 1))
        .as_constraint("decimal");
    assert!(matches!(
        NodeNetwork::build(&[simple], &FunctionRegistry::new()),
        Err(BuildError::DecimalWeightUnsupported { .. })
    ));

    let decimal = factory
        .for_each(PROCESS)
        .penalize(HardSoftDecimalScore::ONE_SOFT)
        .with_decimal_match_weight(Expr::field(0, 1))
        .as_constraint("decimal");
    assert!(NodeNetwork::build(&[decimal], &FunctionRegistry::new()).is_ok());
}

#[test]
fn test_layers_follow_depth() {
    let factory = ConstraintFactory::new("cloud");
    let constraints = vec![factory
        .for_each(PROCESS)
        .join(&factory.for_each(COMPUTER), crate::joiner::none())
        .group_by(Expr::param(1), collector::count())
        .filter(Expr::gt(Expr::param(1), Expr::int(1)))
        .penalize(HardSoftScore::ONE_SOFT)
        .as_constraint("deep")];
    let network = build(&constraints).unwrap();

    assert_eq!(network.layer_count(), 5);
    assert_eq!(network.layers()[0].len(), 2);
    let group = network.nodes_named("group_by")[0];
    assert_eq!(network.node(group).unwrap().layer, 2);
}
