use std::collections::BTreeMap;

use proptest::prelude::*;
use scoreforge_core::{Expr, FactKey, FactSource, HardSoftScore, SimpleScore, Value};
use scoreforge_test::cloud::{
    AppliedMove, CloudBalance, CloudMove, Computer, Process, ASSIGNED, COMPUTER, COST, CPU, MEMORY,
    NETWORK, PROCESS,
};
use scoreforge_test::strategies::{cloud_balance, cloud_moves};

use super::*;
use crate::collector;
use crate::joiner::{equal_bi, less_than};
use crate::stream::ConstraintFactory;

const A: usize = 0;
const B: usize = 1;

fn key(class: usize, id: usize) -> FactKey {
    FactKey::new(class, id)
}

fn session(constraints: Vec<Constraint<SimpleScore>>) -> ConstraintSession<SimpleScore> {
    ConstraintSessionFactory::new(constraints, FunctionRegistry::new())
        .unwrap()
        .create_session()
}

fn matches_of(session: &mut ConstraintSession<SimpleScore>, name: &str) -> Vec<Vec<Value>> {
    session
        .constraint_match_totals()
        .unwrap()
        .into_iter()
        .find(|t| t.constraint_ref.name == name)
        .unwrap()
        .matches
        .into_iter()
        .map(|m| m.justification)
        .collect()
}

#[test]
fn test_join_pairs_equal_values() {
    let factory = ConstraintFactory::new("test");
    let pairs = factory
        .for_each(A)
        .join(&factory.for_each(B), equal_bi(Expr::field(0, 0), Expr::field(0, 0)))
        .penalize(SimpleScore::ONE)
        .as_constraint("pairs");
    let mut session = session(vec![pairs]);

    session.insert(key(A, 1), vec![Value::Int(1)]).unwrap();
    session.insert(key(A, 2), vec![Value::Int(2)]).unwrap();
    session.insert(key(B, 2), vec![Value::Int(2)]).unwrap();
    session.insert(key(B, 3), vec![Value::Int(3)]).unwrap();

    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));
    assert_eq!(
        matches_of(&mut session, "pairs"),
        vec![vec![Value::Fact(key(A, 2)), Value::Fact(key(B, 2))]]
    );

    session.retract(key(A, 1)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));

    session.retract(key(A, 2)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);
    assert!(matches_of(&mut session, "pairs").is_empty());
}

#[test]
fn test_join_update_moves_pairs() {
    let factory = ConstraintFactory::new("test");
    let pairs = factory
        .for_each(A)
        .join(&factory.for_each(B), equal_bi(Expr::field(0, 0), Expr::field(0, 0)))
        .penalize(SimpleScore::ONE)
        .as_constraint("pairs");
    let mut session = session(vec![pairs]);

    session.insert(key(A, 1), vec![Value::Int(1)]).unwrap();
    session.insert(key(B, 1), vec![Value::Int(2)]).unwrap();
    session.insert(key(B, 2), vec![Value::Int(2)]).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);

    session.update(key(A, 1), vec![Value::Int(2)]).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-2));

    session.update(key(B, 2), vec![Value::Int(7)]).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));
}

#[test]
fn test_self_join_excludes_identical_tuple() {
    let factory = ConstraintFactory::new("test");
    let conflicts = factory
        .for_each(A)
        .join(
            &factory.for_each(A),
            equal_bi(Expr::field(0, 0), Expr::field(0, 0))
                .and(less_than(Expr::field(0, 1), Expr::field(0, 1))),
        )
        .penalize(SimpleScore::ONE)
        .as_constraint("conflicts");
    let mut session = session(vec![conflicts]);

    for (id, row) in [(1, 0), (2, 0), (3, 0), (4, 1)] {
        session
            .insert(key(A, id), vec![Value::Int(row), Value::Int(id as i32)])
            .unwrap();
    }
    // Three queens on row 0: pairs (1,2) (1,3) (2,3).
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-3));

    session
        .update(key(A, 3), vec![Value::Int(1), Value::Int(3)])
        .unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-2));
}

#[test]
fn test_group_sum_end_to_end() {
    let factory = ConstraintFactory::new("test");
    let processes = factory.for_each(B);
    let over_budget = processes
        .group_by(Expr::int(0), collector::sum(Expr::field(0, 0)))
        .filter(Expr::gt(Expr::param(1), Expr::int(25)))
        .penalize(SimpleScore::ONE)
        .with_match_weight(Expr::param(1) - Expr::int(25))
        .as_constraint("over budget");
    let expensive = processes
        .filter(Expr::gt(Expr::field(0, 0), Expr::int(8)))
        .penalize(SimpleScore::ONE)
        .as_constraint("expensive");
    let mut session = session(vec![over_budget, expensive]);

    session.insert(key(B, 1), vec![Value::Int(10)]).unwrap();
    session.insert(key(B, 2), vec![Value::Int(20)]).unwrap();
    session.insert(key(B, 3), vec![Value::Int(5)]).unwrap();

    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-12));
    assert_eq!(
        matches_of(&mut session, "over budget"),
        vec![vec![Value::Int(0), Value::Int(35)]]
    );
    let totals = session.constraint_match_totals().unwrap();
    assert_eq!(totals[0].score, SimpleScore::of(-10));

    session.retract(key(B, 2)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));
    assert!(matches_of(&mut session, "over budget").is_empty());
    assert_eq!(
        matches_of(&mut session, "expensive"),
        vec![vec![Value::Fact(key(B, 1))]]
    );
}

#[test]
fn test_group_retracts_empty_group() {
    let factory = ConstraintFactory::new("test");
    let per_row = factory
        .for_each(A)
        .group_by(Expr::field(0, 0), collector::count())
        .penalize(SimpleScore::ONE)
        .with_match_weight(Expr::param(1))
        .as_constraint("per row");
    let mut session = session(vec![per_row]);

    session.insert(key(A, 1), vec![Value::Int(0)]).unwrap();
    session.insert(key(A, 2), vec![Value::Int(0)]).unwrap();
    session.insert(key(A, 3), vec![Value::Int(1)]).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-3));

    session.update(key(A, 3), vec![Value::Int(0)]).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-3));
    assert_eq!(
        matches_of(&mut session, "per row"),
        vec![vec![Value::Int(0), Value::Int(3)]]
    );

    for id in 1..=3 {
        session.retract(key(A, id)).unwrap();
    }
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);
    assert_eq!(session.tuple_count(), 0);
}

#[test]
fn test_creating_tuples_are_invisible_until_flush() {
    let factory = ConstraintFactory::new("test");
    let all = factory
        .for_each(A)
        .penalize(SimpleScore::ONE)
        .as_constraint("all");
    let mut session = session(vec![all]);

    session.insert(key(A, 1), vec![Value::Int(1)]).unwrap();
    assert_eq!(session.root_state(key(A, 1)), Some(TupleState::Creating));
    assert_eq!(session.working_score(), SimpleScore::ZERO);
    assert!(session.is_dirty());

    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));
    assert_eq!(session.root_state(key(A, 1)), Some(TupleState::Ok));

    session.update(key(A, 1), vec![Value::Int(2)]).unwrap();
    assert_eq!(session.root_state(key(A, 1)), Some(TupleState::Updating));
    session.calculate_score().unwrap();
    assert_eq!(session.root_state(key(A, 1)), Some(TupleState::Ok));
}

#[test]
fn test_retract_before_flush_aborts() {
    let factory = ConstraintFactory::new("test");
    let all = factory
        .for_each(A)
        .penalize(SimpleScore::ONE)
        .as_constraint("all");
    let mut session = session(vec![all]);

    session.insert(key(A, 1), vec![Value::Int(1)]).unwrap();
    session.retract(key(A, 1)).unwrap();
    assert_eq!(session.root_state(key(A, 1)), None);
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);
    assert_eq!(session.tuple_count(), 0);
    assert!(!session.contains(key(A, 1)));
}

#[test]
fn test_unknown_and_duplicate_facts_do_not_poison() {
    let mut session = session(Vec::new());
    assert!(matches!(
        session.update(key(A, 9), vec![]),
        Err(ScoreError::UnknownFact(_))
    ));
    session.insert(key(A, 1), vec![]).unwrap();
    assert!(matches!(
        session.insert(key(A, 1), vec![]),
        Err(ScoreError::DuplicateFact(_))
    ));
    assert!(!session.is_poisoned());
    assert_eq!(session.fact_count(), 1);
}

#[test]
fn test_flush_error_poisons_session() {
    let factory = ConstraintFactory::new("test");
    let weighted = factory
        .for_each(A)
        .penalize(SimpleScore::ONE)
        .with_match_weight(Expr::field(0, 0))
        .as_constraint("weighted");
    let mut session = session(vec![weighted]);

    session.insert(key(A, 1), vec![Value::Int(-3)]).unwrap();
    assert!(matches!(
        session.calculate_score(),
        Err(ScoreError::NegativeWeight { .. })
    ));
    assert!(session.is_poisoned());
    assert!(matches!(
        session.calculate_score(),
        Err(ScoreError::Poisoned)
    ));
    assert!(matches!(
        session.insert(key(A, 2), vec![Value::Int(1)]),
        Err(ScoreError::Poisoned)
    ));
}

#[test]
fn test_if_exists_and_if_not_exists() {
    let factory = ConstraintFactory::new("test");
    let assigned = equal_bi(Expr::param(0), Expr::field(0, 0));
    let idle = factory
        .for_each(A)
        .if_not_exists(B, assigned.clone())
        .penalize(SimpleScore::ONE)
        .as_constraint("idle");
    let busy = factory
        .for_each(A)
        .if_exists(B, assigned)
        .reward(SimpleScore::of(10))
        .as_constraint("busy");
    let mut session = session(vec![idle, busy]);

    session.insert(key(A, 1), vec![]).unwrap();
    session.insert(key(A, 2), vec![]).unwrap();
    session
        .insert(key(B, 1), vec![Value::Fact(key(A, 1))])
        .unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(9));
    assert_eq!(
        matches_of(&mut session, "idle"),
        vec![vec![Value::Fact(key(A, 2))]]
    );

    session
        .insert(key(B, 2), vec![Value::Fact(key(A, 1))])
        .unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(9));

    session
        .update(key(B, 1), vec![Value::Fact(key(A, 2))])
        .unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(20));

    session.retract(key(B, 1)).unwrap();
    session.retract(key(B, 2)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-2));
}

#[test]
fn test_flatten_last_and_map() {
    let factory = ConstraintFactory::new("test");
    let gpu_tags = factory
        .for_each(A)
        .map([Expr::field(0, 0)])
        .flatten_last()
        .filter(Expr::eq(Expr::param(0), Expr::literal("gpu")))
        .penalize(SimpleScore::ONE)
        .as_constraint("gpu");
    let mut session = session(vec![gpu_tags]);

    let tags = |t: &[&str]| Value::List(t.iter().map(|s| Value::str(s)).collect());
    session.insert(key(A, 1), vec![tags(&["gpu", "ssd"])]).unwrap();
    session.insert(key(A, 2), vec![tags(&["gpu"])]).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-2));

    session.update(key(A, 1), vec![tags(&["ssd"])]).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));

    session
        .update(key(A, 2), vec![tags(&["ssd", "gpu", "gpu"])])
        .unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-2));

    session.insert(key(A, 3), vec![Value::None]).unwrap();
    assert!(matches!(
        session.calculate_score(),
        Err(ScoreError::NullCollection { .. })
    ));
    assert!(session.is_poisoned());
}

#[test]
fn test_shared_nodes_feed_both_constraints() {
    let factory = ConstraintFactory::new("test");
    let heavy = factory
        .for_each(A)
        .filter(Expr::gt(Expr::field(0, 0), Expr::int(10)));
    let penalty = heavy
        .penalize(SimpleScore::of(2))
        .as_constraint("penalty");
    let reward = heavy.reward(SimpleScore::ONE).as_constraint("reward");
    let mut session = session(vec![penalty, reward]);
    assert_eq!(session.network().shared_count(), 2);

    session.insert(key(A, 1), vec![Value::Int(11)]).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));

    let explanation = session.explain().unwrap();
    assert_eq!(explanation.total_match_count(), 2);
    assert_eq!(explanation.constraints[0].score, SimpleScore::of(-2));
    assert_eq!(explanation.constraints[1].score, SimpleScore::of(1));
}

#[test]
fn test_indictments_and_disabled_tracking() {
    let factory = ConstraintFactory::new("test");
    let pairs = factory
        .for_each(A)
        .join(&factory.for_each(B), equal_bi(Expr::field(0, 0), Expr::field(0, 0)))
        .penalize(SimpleScore::ONE)
        .as_constraint("pairs");
    let sessions = ConstraintSessionFactory::new(vec![pairs], FunctionRegistry::new()).unwrap();

    let mut tracked = sessions.create_session();
    tracked.insert(key(A, 1), vec![Value::Int(1)]).unwrap();
    tracked.insert(key(B, 1), vec![Value::Int(1)]).unwrap();
    tracked.insert(key(B, 2), vec![Value::Int(1)]).unwrap();
    let indictments = tracked.indictments().unwrap();
    assert_eq!(indictments.get(key(A, 1)).unwrap().match_count(), 2);
    assert_eq!(indictments.get(key(B, 2)).unwrap().match_count(), 1);
    assert_eq!(indictments.worst_facts()[0], key(A, 1));

    let mut untracked = sessions.with_constraint_match(false).create_session();
    untracked.insert(key(A, 1), vec![Value::Int(1)]).unwrap();
    assert!(matches!(
        untracked.constraint_match_totals(),
        Err(ScoreError::ConstraintMatchDisabled)
    ));
    let explanation = untracked.explain().unwrap();
    assert!(explanation.match_totals.is_none());
}

#[test]
fn test_weight_overrides_apply_at_build() {
    let factory = ConstraintFactory::new("test");
    let all = factory
        .for_each(A)
        .penalize(SimpleScore::ONE)
        .as_constraint("all");
    let overrides = ConstraintWeightOverrides::from_pairs([("all", SimpleScore::of(5))]);
    let mut session =
        ConstraintSessionFactory::with_weight_overrides(vec![all], FunctionRegistry::new(), &overrides)
            .unwrap()
            .create_session();
    session.insert(key(A, 1), vec![]).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-5));
}

#[test]
fn test_group_refreshes_when_key_fact_changes() {
    let factory = ConstraintFactory::new("test");
    let overloaded = factory
        .for_each(PROCESS)
        .join(
            &factory.for_each(COMPUTER),
            equal_bi(Expr::field(0, ASSIGNED), Expr::param(0)),
        )
        .group_by(Expr::param(1), collector::sum(Expr::field(0, CPU)))
        .filter(Expr::gt(Expr::param(1), Expr::field(0, CPU)))
        .penalize(SimpleScore::ONE)
        .with_match_weight(Expr::param(1) - Expr::field(0, CPU))
        .as_constraint("overloaded");
    let mut session = session(vec![overloaded]);

    let mut computer = Computer::new(0, 10, 10, 1);
    let mut process = Process::new(0, 15, 1);
    process.computer = Some(0);
    session.insert_fact(&computer).unwrap();
    session.insert_fact(&process).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-5));

    // The group's key and sum stay the same, only the capacity behind the key moves.
    computer.cpu = 20;
    session.update_fact(&computer).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);

    computer.cpu = 12;
    session.update_fact(&computer).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-3));
}

#[test]
fn test_float_sum_matches_fresh_session_after_retraction() {
    let factory = ConstraintFactory::new("test");
    let heavy = factory
        .for_each(A)
        .group_by_collector(collector::sum(Expr::field(0, 0)))
        .filter(Expr::gt(Expr::param(0), Expr::literal(0.2)))
        .penalize(SimpleScore::ONE)
        .as_constraint("heavy");
    let sessions = ConstraintSessionFactory::new(vec![heavy], FunctionRegistry::new()).unwrap();

    let mut session = sessions.create_session();
    session.insert(key(A, 1), vec![Value::Float(0.1)]).unwrap();
    session.insert(key(A, 2), vec![Value::Float(0.2)]).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));
    session.retract(key(A, 1)).unwrap();

    let mut fresh = sessions.create_session();
    fresh.insert(key(A, 2), vec![Value::Float(0.2)]).unwrap();
    assert_eq!(fresh.calculate_score().unwrap(), SimpleScore::ZERO);
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);
}

#[test]
fn test_quad_join_counts_ordered_quadruples() {
    let factory = ConstraintFactory::new("test");
    let values = factory.for_each(A);
    let ascending = values
        .join(&values, less_than(Expr::field(0, 0), Expr::field(0, 0)))
        .join(&values, less_than(Expr::field(1, 0), Expr::field(0, 0)))
        .join(&values, less_than(Expr::field(2, 0), Expr::field(0, 0)))
        .penalize(SimpleScore::ONE)
        .as_constraint("ascending");
    let mut session = session(vec![ascending]);

    for id in 1..=5 {
        session.insert(key(A, id), vec![Value::Int(id as i32)]).unwrap();
    }
    // Five choose four.
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-5));
    assert_eq!(
        matches_of(&mut session, "ascending")
            .into_iter()
            .filter(|m| m[0] == Value::Fact(key(A, 1)))
            .count(),
        4
    );

    session.retract(key(A, 5)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));
    assert_eq!(
        matches_of(&mut session, "ascending"),
        vec![(1..=4).map(|id| Value::Fact(key(A, id))).collect::<Vec<_>>()]
    );

    // A tie breaks every quadruple that needs both.
    session.update(key(A, 3), vec![Value::Int(2)]).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);
}

#[test]
fn test_if_exists_in_filtered_stream() {
    let factory = ConstraintFactory::new("test");
    let heavy = factory
        .for_each(B)
        .filter(Expr::gt(Expr::field(0, 1), Expr::int(5)));
    let hosts_heavy = factory
        .for_each(A)
        .if_exists_in(&heavy, equal_bi(Expr::param(0), Expr::field(0, 0)))
        .penalize(SimpleScore::ONE)
        .as_constraint("hosts heavy");
    let hosts_light_only = factory
        .for_each(A)
        .if_not_exists_in(&heavy, equal_bi(Expr::param(0), Expr::field(0, 0)))
        .reward(SimpleScore::ONE)
        .as_constraint("hosts light only");
    let mut session = session(vec![hosts_heavy, hosts_light_only]);

    session.insert(key(A, 1), vec![]).unwrap();
    session.insert(key(A, 2), vec![]).unwrap();
    session
        .insert(key(B, 1), vec![Value::Fact(key(A, 1)), Value::Int(3)])
        .unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(2));

    session
        .update(key(B, 1), vec![Value::Fact(key(A, 1)), Value::Int(9)])
        .unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);
    assert_eq!(
        matches_of(&mut session, "hosts heavy"),
        vec![vec![Value::Fact(key(A, 1))]]
    );
}

fn cloud_constraints() -> Vec<Constraint<HardSoftScore>> {
    let factory = ConstraintFactory::new("cloud");
    let computers = factory.for_each(COMPUTER);
    let assigned = factory
        .for_each(PROCESS)
        .filter(Expr::is_not_none(Expr::field(0, ASSIGNED)));
    let cpu = assigned
        .join(&computers, equal_bi(Expr::field(0, ASSIGNED), Expr::param(0)))
        .group_by(Expr::param(1), collector::sum(Expr::field(0, CPU)))
        .filter(Expr::gt(Expr::param(1), Expr::field(0, CPU)))
        .penalize(HardSoftScore::ONE_HARD)
        .with_match_weight(Expr::param(1) - Expr::field(0, CPU))
        .as_constraint("requiredCpuPower");
    let cost = computers
        .if_exists(PROCESS, equal_bi(Expr::param(0), Expr::field(0, ASSIGNED)))
        .penalize(HardSoftScore::ONE_SOFT)
        .with_match_weight(Expr::field(0, COST))
        .as_constraint("computerCost");
    let crowded = assigned
        .join(
            &assigned,
            equal_bi(Expr::field(0, ASSIGNED), Expr::field(0, ASSIGNED))
                .and(less_than(Expr::field(0, MEMORY), Expr::field(0, MEMORY))),
        )
        .penalize(HardSoftScore::ONE_SOFT)
        .as_constraint("crowded");
    vec![cpu, cost, crowded]
}

/// One constraint per remaining node kind: negative existence, existence
/// against a filtered stream, min/max grouping, map, flattening and
/// tri/quad joins.
fn node_kind_constraints() -> Vec<Constraint<HardSoftScore>> {
    let factory = ConstraintFactory::new("kinds");
    let computers = factory.for_each(COMPUTER);
    let assigned = factory
        .for_each(PROCESS)
        .filter(Expr::is_not_none(Expr::field(0, ASSIGNED)));
    let hosted_by = || equal_bi(Expr::param(0), Expr::field(0, ASSIGNED));

    let idle = computers
        .if_not_exists(PROCESS, hosted_by())
        .penalize(HardSoftScore::ONE_SOFT)
        .as_constraint("idle");
    let heavy = assigned.filter(Expr::gt(Expr::field(0, CPU), Expr::int(7)));
    let hosts_heavy = computers
        .if_exists_in(&heavy, hosted_by())
        .penalize(HardSoftScore::ONE_SOFT)
        .with_match_weight(Expr::field(0, NETWORK))
        .as_constraint("hostsHeavy");
    let cpu_spread = assigned
        .group_by_with(
            Expr::field(0, ASSIGNED),
            collector::min(Expr::field(0, CPU)),
            collector::max(Expr::field(0, CPU)),
        )
        .filter(Expr::gt(Expr::param(2), Expr::param(1)))
        .penalize(HardSoftScore::ONE_SOFT)
        .with_match_weight(Expr::param(2) - Expr::param(1))
        .as_constraint("cpuSpread");
    let footprint = assigned
        .map([Expr::field(0, ASSIGNED), Expr::field(0, MEMORY) + Expr::field(0, NETWORK)])
        .filter(Expr::gt(Expr::param(1), Expr::int(18)))
        .penalize(HardSoftScore::ONE_SOFT)
        .with_match_weight(Expr::param(1) - Expr::int(18))
        .as_constraint("footprint");
    let large_share = assigned
        .group_by(Expr::field(0, ASSIGNED), collector::to_list(Expr::field(0, CPU)))
        .flatten_last()
        .filter(Expr::gt(Expr::param(1), Expr::int(6)))
        .penalize(HardSoftScore::ONE_SOFT)
        .as_constraint("largeShare");
    let same_host = |left: usize| {
        equal_bi(Expr::field(left, ASSIGNED), Expr::field(0, ASSIGNED))
            .and(less_than(Expr::field(left, MEMORY), Expr::field(0, MEMORY)))
    };
    let pairs = assigned.join(&assigned, same_host(0));
    let triples = pairs.join(&assigned, same_host(1));
    let triple_count = triples
        .penalize(HardSoftScore::ONE_SOFT)
        .as_constraint("triples");
    let quadruples = triples
        .join(&assigned, same_host(2))
        .penalize(HardSoftScore::ONE_HARD)
        .as_constraint("quadruples");
    vec![
        idle,
        hosts_heavy,
        cpu_spread,
        footprint,
        large_share,
        triple_count,
        quadruples,
    ]
}

fn from_scratch(
    sessions: &ConstraintSessionFactory<HardSoftScore>,
    solution: &CloudBalance,
) -> HardSoftScore {
    let mut fresh = sessions.create_session();
    let mut result = Ok(());
    solution.visit_facts(&mut |fact: &dyn PlanningFact| {
        if result.is_ok() {
            result = fresh.insert_fact(fact);
        }
    });
    result.unwrap();
    fresh.calculate_score().unwrap()
}

fn match_counts(session: &mut ConstraintSession<HardSoftScore>) -> BTreeMap<String, usize> {
    session
        .constraint_match_totals()
        .unwrap()
        .into_iter()
        .map(|t| (t.constraint_ref.name.clone(), t.match_count()))
        .collect()
}

fn replay(
    session: &mut ConstraintSession<HardSoftScore>,
    solution: &CloudBalance,
    applied: Vec<AppliedMove>,
) {
    for change in applied {
        match change {
            AppliedMove::Changed(key) => {
                session.update_fact(solution.fact(key).unwrap()).unwrap();
            }
            AppliedMove::Added(key) => {
                session.insert_fact(solution.fact(key).unwrap()).unwrap();
            }
            AppliedMove::Removed(key) => session.retract(key).unwrap(),
        }
    }
}

#[test]
fn test_cloud_balance_scores() {
    let sessions =
        ConstraintSessionFactory::new(cloud_constraints(), FunctionRegistry::new()).unwrap();
    let computers = vec![Computer::new(0, 10, 32, 100), Computer::new(1, 40, 64, 300)];
    let processes = (0..4)
        .map(|id| {
            let mut process = Process::new(id, 3, id as i32 + 1);
            process.computer = Some(0);
            process
        })
        .collect();
    let mut solution = CloudBalance::new(computers, processes);
    let mut session = sessions.create_session();
    solution.visit_facts(&mut |fact: &dyn PlanningFact| session.insert_fact(fact).unwrap());

    // 12 cpu on a 10 cpu computer, one computer in use, six crowded pairs.
    let score = session.calculate_score().unwrap();
    assert_eq!(score, HardSoftScore::of(-2, -106));
    assert_eq!(score, from_scratch(&sessions, &solution));
    let counts = match_counts(&mut session);
    assert_eq!(counts["crowded"], 6);
    assert_eq!(counts["computerCost"], 1);

    // Removing the busy computer unassigns every process.
    let applied = solution.apply(&CloudMove::RemoveComputer { computer: 0 });
    replay(&mut session, &solution, applied);
    assert_eq!(session.calculate_score().unwrap(), HardSoftScore::ZERO);
    assert_eq!(session.fact_count(), 5);
}

#[test]
fn test_node_kinds_on_fixed_solution() {
    let sessions =
        ConstraintSessionFactory::new(node_kind_constraints(), FunctionRegistry::new()).unwrap();
    let computers = vec![
        Computer::new(0, 20, 32, 100).with_network(5),
        Computer::new(1, 20, 32, 100),
    ];
    let processes = [(8, 1), (2, 2), (3, 15), (4, 4)]
        .into_iter()
        .enumerate()
        .map(|(id, (cpu, memory))| {
            let mut process = Process::new(id, cpu, memory).with_network(4);
            process.computer = Some(0);
            process
        })
        .collect();
    let solution = CloudBalance::new(computers, processes);
    let mut session = sessions.create_session();
    solution.visit_facts(&mut |fact: &dyn PlanningFact| session.insert_fact(fact).unwrap());

    let counts = match_counts(&mut session);
    assert_eq!(counts["idle"], 1);
    assert_eq!(counts["hostsHeavy"], 1);
    assert_eq!(counts["cpuSpread"], 1);
    assert_eq!(counts["footprint"], 1);
    assert_eq!(counts["largeShare"], 1);
    assert_eq!(counts["triples"], 4);
    assert_eq!(counts["quadruples"], 1);
    // idle 1, hostsHeavy 5, cpuSpread 8 - 2, footprint 19 - 18, largeShare 1,
    // triples 4; the only quadruple is hard.
    assert_eq!(
        session.calculate_score().unwrap(),
        HardSoftScore::of(-1, -18)
    );
    assert_eq!(
        session.calculate_score().unwrap(),
        from_scratch(&sessions, &solution)
    );
}

fn assert_replay_matches_from_scratch(
    constraints: Vec<Constraint<HardSoftScore>>,
    initial: CloudBalance,
    moves: &[CloudMove],
) -> Result<(), TestCaseError> {
    let sessions = ConstraintSessionFactory::new(constraints, FunctionRegistry::new()).unwrap();
    let mut solution = initial;
    let mut session = sessions.create_session();
    solution.visit_facts(&mut |fact: &dyn PlanningFact| session.insert_fact(fact).unwrap());
    session.calculate_score().unwrap();

    for (step, mv) in moves.iter().enumerate() {
        let applied = solution.apply(mv);
        replay(&mut session, &solution, applied);
        // Flush only every few moves so changes pile up in the queues.
        if step % 3 == 2 {
            let working = session.calculate_score().unwrap();
            prop_assert_eq!(working, from_scratch(&sessions, &solution));
        }
    }

    let working = session.calculate_score().unwrap();
    prop_assert_eq!(working, from_scratch(&sessions, &solution));
    prop_assert_eq!(session.fact_count(), solution.fact_count());
    Ok(())
}

proptest! {
    #[test]
    fn incremental_matches_from_scratch(
        initial in cloud_balance(3, 6),
        moves in cloud_moves(25),
    ) {
        assert_replay_matches_from_scratch(cloud_constraints(), initial, &moves)?;
    }

    #[test]
    fn every_node_kind_matches_from_scratch(
        initial in cloud_balance(3, 8),
        moves in cloud_moves(25),
    ) {
        assert_replay_matches_from_scratch(node_kind_constraints(), initial, &moves)?;
    }
}
