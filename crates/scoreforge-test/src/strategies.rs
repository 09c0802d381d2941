//! proptest strategies over the cloud balancing domain.

use proptest::prelude::*;

use crate::cloud::{CloudBalance, CloudMove, Computer, Process};

pub fn computer(id: usize) -> impl Strategy<Value = Computer> {
    (4..=24i32, 8..=64i32, 1..=500i32, 4..=32i32).prop_map(move |(cpu, memory, cost, network)| {
        Computer::new(id, cpu, memory, cost).with_network(network)
    })
}

pub fn process(id: usize, computer_count: usize) -> impl Strategy<Value = Process> {
    (
        1..=10i32,
        1..=16i32,
        1..=8i32,
        proptest::option::of(0..computer_count.max(1)),
    )
        .prop_map(move |(cpu, memory, network, computer)| Process {
            id,
            cpu,
            memory,
            network,
            computer,
        })
}

/// Solutions with up to `max_computers` computers and `max_processes`
/// processes, with random initial assignments.
pub fn cloud_balance(
    max_computers: usize,
    max_processes: usize,
) -> impl Strategy<Value = CloudBalance> {
    (1..=max_computers.max(1), 0..=max_processes).prop_flat_map(|(computers, processes)| {
        let computers_strategy: Vec<_> = (0..computers).map(computer).collect();
        let processes_strategy: Vec<_> = (0..processes)
            .map(|id| process(id, computers))
            .collect();
        (computers_strategy, processes_strategy)
            .prop_map(|(computers, processes)| CloudBalance::new(computers, processes))
    })
}

pub fn cloud_move() -> impl Strategy<Value = CloudMove> {
    prop_oneof![
        6 => (any::<usize>(), proptest::option::of(any::<usize>()))
            .prop_map(|(process, computer)| CloudMove::Assign { process, computer }),
        2 => (any::<usize>(), 1..=10i32)
            .prop_map(|(process, cpu)| CloudMove::SetCpu { process, cpu }),
        1 => (1..=10i32, 1..=16i32)
            .prop_map(|(cpu, memory)| CloudMove::AddProcess { cpu, memory }),
        1 => any::<usize>().prop_map(|process| CloudMove::RemoveProcess { process }),
        2 => (any::<usize>(), 4..=24i32, 8..=64i32)
            .prop_map(|(computer, cpu, memory)| CloudMove::SetCapacity { computer, cpu, memory }),
        1 => (any::<usize>(), 1..=500i32)
            .prop_map(|(computer, cost)| CloudMove::SetCost { computer, cost }),
        1 => (4..=24i32, 8..=64i32, 1..=500i32)
            .prop_map(|(cpu, memory, cost)| CloudMove::AddComputer { cpu, memory, cost }),
        1 => any::<usize>().prop_map(|computer| CloudMove::RemoveComputer { computer }),
    ]
}

pub fn cloud_moves(max_len: usize) -> impl Strategy<Value = Vec<CloudMove>> {
    proptest::collection::vec(cloud_move(), 0..=max_len)
}
