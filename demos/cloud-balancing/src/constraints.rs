//! Cloud balancing constraints.

use scoreforge::collector::{max, min, sum};
use scoreforge::joiner::equal_bi;
use scoreforge::stream::{Constraint, ConstraintFactory};
use scoreforge::{Expr, HardSoftScore};
use scoreforge_test::cloud::{ASSIGNED, COMPUTER, COST, CPU, MEMORY, NETWORK, PROCESS};

pub fn define_constraints() -> Vec<Constraint<HardSoftScore>> {
    let factory = ConstraintFactory::new("cloudBalancing");
    vec![
        required_capacity(&factory, CPU, "requiredCpuPowerTotal"),
        required_capacity(&factory, MEMORY, "requiredMemoryTotal"),
        required_capacity(&factory, NETWORK, "requiredNetworkBandwidthTotal"),
        computer_cost(&factory),
        difference_in_required_cpu(&factory),
    ]
}

// Sum of a resource over each computer's processes must not exceed the
// computer's own capacity for it.
fn required_capacity(
    factory: &ConstraintFactory,
    field: usize,
    name: &str,
) -> Constraint<HardSoftScore> {
    factory
        .for_each(PROCESS)
        .join(
            &factory.for_each(COMPUTER),
            equal_bi(Expr::field(0, ASSIGNED), Expr::param(0)),
        )
        .group_by(Expr::param(1), sum(Expr::field(0, field)))
        .filter(Expr::gt(Expr::param(1), Expr::field(0, field)))
        .penalize(HardSoftScore::ONE_HARD)
        .with_match_weight(Expr::param(1) - Expr::field(0, field))
        .as_constraint(name)
}

fn computer_cost(factory: &ConstraintFactory) -> Constraint<HardSoftScore> {
    factory
        .for_each(COMPUTER)
        .if_exists(
            PROCESS,
            equal_bi(Expr::param(0), Expr::field(0, ASSIGNED)),
        )
        .penalize(HardSoftScore::ONE_SOFT)
        .with_match_weight(Expr::field(0, COST))
        .as_constraint("computerCost")
}

/// Processes sharing a computer should need similar CPU power. Each computer
/// costs the square of its max-min spread.
fn difference_in_required_cpu(factory: &ConstraintFactory) -> Constraint<HardSoftScore> {
    let spread = || Expr::param(2) - Expr::param(1);
    factory
        .for_each(PROCESS)
        .filter(Expr::is_not_none(Expr::field(0, ASSIGNED)))
        .group_by_with(
            Expr::field(0, ASSIGNED),
            min(Expr::field(0, CPU)),
            max(Expr::field(0, CPU)),
        )
        .filter(Expr::gt(Expr::param(2), Expr::param(1)))
        .penalize(HardSoftScore::ONE_HARD)
        .with_match_weight(spread() * spread())
        .as_constraint("differenceInRequiredCpu")
}
