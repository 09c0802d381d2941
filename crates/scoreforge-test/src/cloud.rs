//! Cloud balancing test fixtures.
//!
//! Processes are assigned to computers; a computer has CPU, memory and
//! network capacities and a fixed cost that is paid once any process runs on
//! it.
//!
//! Field layout as seen by constraint expressions:
//!
//! | class | [`CPU`] | [`MEMORY`] | 2 | [`NETWORK`] |
//! |---|---|---|---|---|
//! | [`COMPUTER`] | cpu | memory | cost ([`COST`]) | bandwidth |
//! | [`PROCESS`] | cpu | memory | computer ([`ASSIGNED`], `Fact` or `None`) | bandwidth |
//!
//! # Example
//!
//! ```
//! use scoreforge_core::{FactKey, FactSource, Value};
//! use scoreforge_test::cloud::{CloudBalance, ASSIGNED, COMPUTER, PROCESS};
//!
//! let mut solution = CloudBalance::generate(3, 6, 42);
//! assert_eq!(solution.fact_count(), 9);
//!
//! solution.assign(0, Some(2));
//! let process = solution.fact(FactKey::new(PROCESS, 0)).unwrap();
//! assert_eq!(process.field(ASSIGNED), Value::Fact(FactKey::new(COMPUTER, 2)));
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use scoreforge_core::{FactKey, FactSource, PlanningFact, Value};

/// Fact class of [`Computer`].
pub const COMPUTER: usize = 0;

/// Fact class of [`Process`].
pub const PROCESS: usize = 1;

pub const CPU: usize = 0;
pub const MEMORY: usize = 1;
/// Computer cost.
pub const COST: usize = 2;
/// Assigned computer of a process.
pub const ASSIGNED: usize = 2;
pub const NETWORK: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Computer {
    pub id: usize,
    pub cpu: i32,
    pub memory: i32,
    pub cost: i32,
    pub network: i32,
}

impl Computer {
    /// A computer without network bandwidth.
    pub fn new(id: usize, cpu: i32, memory: i32, cost: i32) -> Self {
        Self {
            id,
            cpu,
            memory,
            cost,
            network: 0,
        }
    }

    pub fn with_network(mut self, network: i32) -> Self {
        self.network = network;
        self
    }

    pub fn key(&self) -> FactKey {
        FactKey::new(COMPUTER, self.id)
    }
}

impl PlanningFact for Computer {
    fn fact_key(&self) -> FactKey {
        self.key()
    }

    fn field_count(&self) -> usize {
        4
    }

    fn field(&self, idx: usize) -> Value {
        match idx {
            CPU => Value::Int(self.cpu),
            MEMORY => Value::Int(self.memory),
            COST => Value::Int(self.cost),
            NETWORK => Value::Int(self.network),
            _ => Value::None,
        }
    }
}

/// A process; `computer` is its planning variable and holds a computer id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Process {
    pub id: usize,
    pub cpu: i32,
    pub memory: i32,
    pub network: i32,
    pub computer: Option<usize>,
}

impl Process {
    /// An unassigned process without network demand.
    pub fn new(id: usize, cpu: i32, memory: i32) -> Self {
        Self {
            id,
            cpu,
            memory,
            network: 0,
            computer: None,
        }
    }

    pub fn with_network(mut self, network: i32) -> Self {
        self.network = network;
        self
    }

    pub fn key(&self) -> FactKey {
        FactKey::new(PROCESS, self.id)
    }
}

impl PlanningFact for Process {
    fn fact_key(&self) -> FactKey {
        self.key()
    }

    fn field_count(&self) -> usize {
        4
    }

    fn field(&self, idx: usize) -> Value {
        match idx {
            CPU => Value::Int(self.cpu),
            MEMORY => Value::Int(self.memory),
            ASSIGNED => self
                .computer
                .map_or(Value::None, |c| Value::Fact(FactKey::new(COMPUTER, c))),
            NETWORK => Value::Int(self.network),
            _ => Value::None,
        }
    }
}

/// A single change to a [`CloudBalance`].
///
/// Indices are taken modulo the current collection sizes so that randomly
/// generated moves always apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloudMove {
    Assign {
        process: usize,
        computer: Option<usize>,
    },
    SetCpu {
        process: usize,
        cpu: i32,
    },
    AddProcess {
        cpu: i32,
        memory: i32,
    },
    RemoveProcess {
        process: usize,
    },
    SetCapacity {
        computer: usize,
        cpu: i32,
        memory: i32,
    },
    SetCost {
        computer: usize,
        cost: i32,
    },
    AddComputer {
        cpu: i32,
        memory: i32,
        cost: i32,
    },
    /// Unassigns the computer's processes, then removes it.
    RemoveComputer {
        computer: usize,
    },
}

/// One fact change made by [`CloudBalance::apply`], for replaying it against
/// a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppliedMove {
    Changed(FactKey),
    Added(FactKey),
    Removed(FactKey),
}

#[derive(Clone, Debug, Default)]
pub struct CloudBalance {
    pub computers: Vec<Computer>,
    pub processes: Vec<Process>,
    next_computer_id: usize,
    next_process_id: usize,
}

impl CloudBalance {
    pub fn new(computers: Vec<Computer>, processes: Vec<Process>) -> Self {
        let next_computer_id = computers.iter().map(|c| c.id + 1).max().unwrap_or(0);
        let next_process_id = processes.iter().map(|p| p.id + 1).max().unwrap_or(0);
        Self {
            computers,
            processes,
            next_computer_id,
            next_process_id,
        }
    }

    /// Random instance; processes start unassigned.
    pub fn generate(computer_count: usize, process_count: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let computers = (0..computer_count)
            .map(|id| {
                Computer::new(
                    id,
                    rng.random_range(8..=24),
                    rng.random_range(16..=64),
                    rng.random_range(100..=500),
                )
                .with_network(rng.random_range(16..=64))
            })
            .collect();
        let processes = (0..process_count)
            .map(|id| {
                Process::new(id, rng.random_range(1..=8), rng.random_range(1..=16))
                    .with_network(rng.random_range(1..=12))
            })
            .collect();
        Self::new(computers, processes)
    }

    /// Assigns process at `index` to the computer with id `computer` and
    /// returns the process key.
    pub fn assign(&mut self, index: usize, computer: Option<usize>) -> FactKey {
        let process = &mut self.processes[index];
        process.computer = computer;
        process.key()
    }

    pub fn process(&self, key: FactKey) -> Option<&Process> {
        (key.class == PROCESS)
            .then(|| self.processes.iter().find(|p| p.id == key.id))
            .flatten()
    }

    pub fn computer(&self, key: FactKey) -> Option<&Computer> {
        (key.class == COMPUTER)
            .then(|| self.computers.iter().find(|c| c.id == key.id))
            .flatten()
    }

    /// Applies `mv` and lists the resulting fact changes in order.
    pub fn apply(&mut self, mv: &CloudMove) -> Vec<AppliedMove> {
        match *mv {
            CloudMove::Assign { process, computer } => {
                if self.processes.is_empty() {
                    return Vec::new();
                }
                let index = process % self.processes.len();
                let computer = match computer {
                    Some(c) if !self.computers.is_empty() => {
                        Some(self.computers[c % self.computers.len()].id)
                    }
                    _ => None,
                };
                vec![AppliedMove::Changed(self.assign(index, computer))]
            }
            CloudMove::SetCpu { process, cpu } => {
                if self.processes.is_empty() {
                    return Vec::new();
                }
                let index = process % self.processes.len();
                self.processes[index].cpu = cpu;
                vec![AppliedMove::Changed(self.processes[index].key())]
            }
            CloudMove::AddProcess { cpu, memory } => {
                let process = Process::new(self.next_process_id, cpu, memory).with_network(memory / 2);
                self.next_process_id += 1;
                let key = process.key();
                self.processes.push(process);
                vec![AppliedMove::Added(key)]
            }
            CloudMove::RemoveProcess { process } => {
                if self.processes.is_empty() {
                    return Vec::new();
                }
                let index = process % self.processes.len();
                vec![AppliedMove::Removed(self.processes.remove(index).key())]
            }
            CloudMove::SetCapacity {
                computer,
                cpu,
                memory,
            } => {
                if self.computers.is_empty() {
                    return Vec::new();
                }
                let index = computer % self.computers.len();
                let computer = &mut self.computers[index];
                computer.cpu = cpu;
                computer.memory = memory;
                vec![AppliedMove::Changed(computer.key())]
            }
            CloudMove::SetCost { computer, cost } => {
                if self.computers.is_empty() {
                    return Vec::new();
                }
                let index = computer % self.computers.len();
                self.computers[index].cost = cost;
                vec![AppliedMove::Changed(self.computers[index].key())]
            }
            CloudMove::AddComputer { cpu, memory, cost } => {
                let computer =
                    Computer::new(self.next_computer_id, cpu, memory, cost).with_network(memory);
                self.next_computer_id += 1;
                let key = computer.key();
                self.computers.push(computer);
                vec![AppliedMove::Added(key)]
            }
            CloudMove::RemoveComputer { computer } => {
                if self.computers.is_empty() {
                    return Vec::new();
                }
                let removed = self.computers.remove(computer % self.computers.len());
                let mut applied: Vec<_> = self
                    .processes
                    .iter_mut()
                    .filter(|p| p.computer == Some(removed.id))
                    .map(|p| {
                        p.computer = None;
                        AppliedMove::Changed(p.key())
                    })
                    .collect();
                applied.push(AppliedMove::Removed(removed.key()));
                applied
            }
        }
    }
}

impl FactSource for CloudBalance {
    fn visit_facts(&self, visitor: &mut dyn FnMut(&dyn PlanningFact)) {
        for computer in &self.computers {
            visitor(computer);
        }
        for process in &self.processes {
            visitor(process);
        }
    }

    fn fact(&self, key: FactKey) -> Option<&dyn PlanningFact> {
        match key.class {
            COMPUTER => self.computer(key).map(|c| c as &dyn PlanningFact),
            PROCESS => self.process(key).map(|p| p as &dyn PlanningFact),
            _ => None,
        }
    }

    fn fact_count(&self) -> usize {
        self.computers.len() + self.processes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_deterministic() {
        let a = CloudBalance::generate(4, 10, 7);
        let b = CloudBalance::generate(4, 10, 7);
        assert_eq!(a.computers, b.computers);
        assert_eq!(a.processes, b.processes);
    }

    #[test]
    fn test_apply_wraps_indices() {
        let mut solution = CloudBalance::generate(2, 3, 1);
        let applied = solution.apply(&CloudMove::Assign {
            process: 4,
            computer: Some(3),
        });
        assert_eq!(applied, vec![AppliedMove::Changed(FactKey::new(PROCESS, 1))]);
        assert_eq!(solution.processes[1].computer, Some(1));
    }

    #[test]
    fn test_add_and_remove_keep_ids_unique() {
        let mut solution = CloudBalance::generate(1, 2, 1);
        solution.apply(&CloudMove::RemoveProcess { process: 1 });
        let applied = solution.apply(&CloudMove::AddProcess { cpu: 1, memory: 1 });
        assert_eq!(applied, vec![AppliedMove::Added(FactKey::new(PROCESS, 2))]);
        assert_eq!(solution.fact_count(), 3);
    }

    #[test]
    fn test_remove_computer_unassigns_its_processes() {
        let mut solution = CloudBalance::generate(2, 3, 5);
        solution.assign(0, Some(1));
        solution.assign(2, Some(1));
        solution.assign(1, Some(0));

        let applied = solution.apply(&CloudMove::RemoveComputer { computer: 1 });
        assert_eq!(
            applied,
            vec![
                AppliedMove::Changed(FactKey::new(PROCESS, 0)),
                AppliedMove::Changed(FactKey::new(PROCESS, 2)),
                AppliedMove::Removed(FactKey::new(COMPUTER, 1)),
            ]
        );
        assert_eq!(solution.processes[1].computer, Some(0));
        assert!(solution.fact(FactKey::new(COMPUTER, 1)).is_none());

        // Assignments pick computers by position; position 1 is now computer 2.
        let added = solution.apply(&CloudMove::AddComputer {
            cpu: 4,
            memory: 4,
            cost: 1,
        });
        assert_eq!(added, vec![AppliedMove::Added(FactKey::new(COMPUTER, 2))]);
        solution.apply(&CloudMove::Assign {
            process: 0,
            computer: Some(1),
        });
        assert_eq!(solution.processes[0].computer, Some(2));
    }

    #[test]
    fn test_computer_changes() {
        let mut solution = CloudBalance::generate(2, 0, 3);
        let applied = solution.apply(&CloudMove::SetCapacity {
            computer: 3,
            cpu: 5,
            memory: 6,
        });
        assert_eq!(applied, vec![AppliedMove::Changed(FactKey::new(COMPUTER, 1))]);
        let computer = solution.fact(FactKey::new(COMPUTER, 1)).unwrap();
        assert_eq!(computer.field(CPU), Value::Int(5));
        assert_eq!(computer.field(MEMORY), Value::Int(6));

        solution.apply(&CloudMove::SetCost { computer: 0, cost: 9 });
        assert_eq!(solution.computers[0].cost, 9);
        assert!(CloudBalance::default()
            .apply(&CloudMove::RemoveComputer { computer: 0 })
            .is_empty());
    }
}
