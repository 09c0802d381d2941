//! Tuples and their lifecycle.
//!
//! Tuples live in a generational arena owned by the session. A [`TupleId`]
//! whose generation no longer matches refers to a tuple that has died; any
//! access through it fails with [`ScoreError::DeadTuple`].

use std::fmt;

use scoreforge_core::{Score, Value};
use smallvec::SmallVec;

use crate::error::{ScoreError, ScoreResult};
use crate::impact::UndoScoreImpact;
use crate::node::{ExistsLeftEntry, ExistsRightEntry, GroupEntry, JoinEntry};

/// Tuple elements, stored inline up to quad arity.
pub type TupleValues = SmallVec<[Value; 4]>;

/// Handle to a tuple in a [`TupleArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TupleId {
    index: u32,
    generation: u32,
}

impl fmt::Display for TupleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}.{}", self.index, self.generation)
    }
}

/// Lifecycle state of a tuple.
///
/// ```text
/// Creating ──flush──> Ok ──update──> Updating ──flush──> Ok
///    │                 │                │
///  retract          retract          retract
///    v                 v                v
/// Aborting          Dying <─────────────┘
///    └──flush──> Dead <──flush──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TupleState {
    Creating,
    Ok,
    Updating,
    Dying,
    Aborting,
    Dead,
}

impl TupleState {
    /// True while the tuple waits in its owner's queue.
    pub fn is_dirty(self) -> bool {
        !matches!(self, TupleState::Ok | TupleState::Dead)
    }
}

/// Per-consumer bookkeeping attached to a tuple.
///
/// A tuple carries one slot per outgoing edge of its owning node; the
/// consumer on that edge is the only one that reads or writes it.
#[derive(Debug, Default)]
pub(crate) enum Slot<Sc: Score> {
    #[default]
    Empty,
    /// Downstream tuple of a one-to-one node (filter, map, exists).
    Child(TupleId),
    /// Downstream tuples of a flattening node.
    Children(Vec<TupleId>),
    Join(JoinEntry),
    ExistsLeft(ExistsLeftEntry),
    ExistsRight(ExistsRightEntry),
    Group(GroupEntry),
    Impact(UndoScoreImpact<Sc>),
}

#[derive(Debug)]
pub(crate) struct Tuple<Sc: Score> {
    pub values: TupleValues,
    pub state: TupleState,
    pub owner: usize,
    pub slots: Vec<Slot<Sc>>,
}

#[derive(Debug)]
struct Entry<Sc: Score> {
    generation: u32,
    tuple: Option<Tuple<Sc>>,
}

/// Generational storage for every tuple of a session.
#[derive(Debug)]
pub(crate) struct TupleArena<Sc: Score> {
    entries: Vec<Entry<Sc>>,
    free: Vec<u32>,
    live: usize,
}

impl<Sc: Score> Default for TupleArena<Sc> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }
}

impl<Sc: Score> TupleArena<Sc> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a tuple in state `Creating`.
    pub fn create(&mut self, owner: usize, values: TupleValues, slot_count: usize) -> TupleId {
        let mut slots = Vec::with_capacity(slot_count);
        slots.resize_with(slot_count, Slot::default);
        let tuple = Tuple {
            values,
            state: TupleState::Creating,
            owner,
            slots,
        };
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.tuple = Some(tuple);
            TupleId {
                index,
                generation: entry.generation,
            }
        } else {
            let index = self.entries.len() as u32;
            self.entries.push(Entry {
                generation: 0,
                tuple: Some(tuple),
            });
            TupleId {
                index,
                generation: 0,
            }
        }
    }

    pub fn get(&self, id: TupleId) -> ScoreResult<&Tuple<Sc>> {
        self.entries
            .get(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.tuple.as_ref())
            .ok_or(ScoreError::DeadTuple(id))
    }

    pub fn get_mut(&mut self, id: TupleId) -> ScoreResult<&mut Tuple<Sc>> {
        self.entries
            .get_mut(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.tuple.as_mut())
            .ok_or(ScoreError::DeadTuple(id))
    }

    pub fn values(&self, id: TupleId) -> ScoreResult<&[Value]> {
        Ok(&self.get(id)?.values)
    }

    /// State of a tuple; stale handles report `Dead`.
    pub fn state(&self, id: TupleId) -> TupleState {
        self.get(id).map_or(TupleState::Dead, |t| t.state)
    }

    pub fn set_values(&mut self, id: TupleId, values: TupleValues) -> ScoreResult<()> {
        self.get_mut(id)?.values = values;
        Ok(())
    }

    pub fn slot_mut(&mut self, id: TupleId, slot: usize) -> ScoreResult<&mut Slot<Sc>> {
        let tuple = self.get_mut(id)?;
        tuple.slots.get_mut(slot).ok_or(ScoreError::DeadTuple(id))
    }

    pub fn take_slot(&mut self, id: TupleId, slot: usize) -> ScoreResult<Slot<Sc>> {
        Ok(std::mem::take(self.slot_mut(id, slot)?))
    }

    pub fn put_slot(&mut self, id: TupleId, slot: usize, value: Slot<Sc>) -> ScoreResult<()> {
        *self.slot_mut(id, slot)? = value;
        Ok(())
    }

    /// Marks a tuple as changed. Returns true if it must be queued.
    pub fn mark_updating(&mut self, id: TupleId) -> ScoreResult<bool> {
        let tuple = self.get_mut(id)?;
        match tuple.state {
            TupleState::Ok => {
                tuple.state = TupleState::Updating;
                Ok(true)
            }
            TupleState::Creating | TupleState::Updating => Ok(false),
            from => Err(ScoreError::InvalidTransition {
                tuple: id,
                from,
                to: TupleState::Updating,
            }),
        }
    }

    /// Marks a tuple for removal. Returns true if it must be queued.
    pub fn mark_retracting(&mut self, id: TupleId) -> ScoreResult<bool> {
        let tuple = self.get_mut(id)?;
        match tuple.state {
            TupleState::Ok => {
                tuple.state = TupleState::Dying;
                Ok(true)
            }
            TupleState::Updating => {
                tuple.state = TupleState::Dying;
                Ok(false)
            }
            TupleState::Creating => {
                tuple.state = TupleState::Aborting;
                Ok(false)
            }
            from => Err(ScoreError::InvalidTransition {
                tuple: id,
                from,
                to: TupleState::Dying,
            }),
        }
    }

    /// Settles a queued tuple after its changes reached every consumer.
    pub fn settle(&mut self, id: TupleId) -> ScoreResult<()> {
        let state = self.get(id)?.state;
        match state {
            TupleState::Creating | TupleState::Updating => {
                self.get_mut(id)?.state = TupleState::Ok;
                Ok(())
            }
            TupleState::Dying | TupleState::Aborting => {
                self.kill(id);
                Ok(())
            }
            from => Err(ScoreError::InvalidTransition {
                tuple: id,
                from,
                to: TupleState::Ok,
            }),
        }
    }

    fn kill(&mut self, id: TupleId) {
        if let Some(entry) = self.entries.get_mut(id.index as usize) {
            if entry.generation == id.generation && entry.tuple.take().is_some() {
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(id.index);
                self.live -= 1;
            }
        }
    }

    /// Number of live tuples.
    pub fn len(&self) -> usize {
        self.live
    }
}
