//! Error types for building constraint networks and running sessions.

use scoreforge_config::ConfigError;
use scoreforge_core::{FactKey, ValueKind};
use thiserror::Error;

use crate::analysis::ScoreCorruption;
use crate::impact::ImpactKind;
use crate::tuple::{TupleId, TupleState};

/// Errors raised while compiling constraints into a node network.
///
/// These are configuration errors: they are reported once, at build time,
/// and no session is created.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{context} references tuple position {param} but the stream has arity {arity}")]
    ArityMismatch {
        context: String,
        param: usize,
        arity: usize,
    },

    #[error("cyclic stream definition: {}", path.join(" -> "))]
    CyclicStream { path: Vec<String> },

    #[error("unknown stream '{0}'")]
    UnknownStream(String),

    #[error("constraint '{0}' is defined more than once")]
    DuplicateConstraint(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("constraint '{constraint}' uses decimal match weights but {score_type} is integral")]
    DecimalWeightUnsupported {
        constraint: String,
        score_type: &'static str,
    },

    #[error("invalid stream: {0}")]
    InvalidStream(String),

    #[error("invalid weight '{weight}' for constraint '{constraint}': {message}")]
    InvalidWeight {
        constraint: String,
        weight: String,
        message: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while propagating changes or calculating a score.
///
/// Any of these raised during a flush poisons the session that raised it.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("tuple {0} is dead")]
    DeadTuple(TupleId),

    #[error("tuple {tuple} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        tuple: TupleId,
        from: TupleState,
        to: TupleState,
    },

    #[error("fact {0} is not known to the session")]
    UnknownFact(FactKey),

    #[error("fact {0} was already inserted")]
    DuplicateFact(FactKey),

    #[error("tuple position {param} is out of range for a tuple of arity {arity}")]
    ParamOutOfRange { param: usize, arity: usize },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("field {field} is out of range for fact {fact}")]
    FieldOutOfRange { fact: FactKey, field: usize },

    #[error("Impossible state: passing {actual} into an {expected} impacter for constraint ({constraint})")]
    WrongImpactType {
        constraint: String,
        expected: ImpactKind,
        actual: ImpactKind,
    },

    #[error("negative match weight ({weight}) for constraint ({constraint}); use impact() for signed weights")]
    NegativeWeight { constraint: String, weight: String },

    #[error("match weight ({weight}) for constraint ({constraint}) is not representable in the score")]
    WeightNotRepresentable { constraint: String, weight: String },

    #[error("score of constraint ({constraint}) overflows")]
    ScoreOverflow { constraint: String },

    #[error("type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        context: &'static str,
        expected: &'static str,
        actual: ValueKind,
    },

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error("collection accessor {accessor} returned null")]
    NullCollection { accessor: String },

    #[error("tuple {tuple} has no {node} bookkeeping")]
    MissingSlot { tuple: TupleId, node: &'static str },

    #[error("undo token does not belong to this {0} accumulator")]
    InvalidUndo(&'static str),

    #[error("constraint match {0} was already undone")]
    UndoTwice(u64),

    #[error("unpaired notification for fact {fact}: {message}")]
    UnpairedNotification { fact: FactKey, message: String },

    #[error("constraint match tracking is disabled for this session")]
    ConstraintMatchDisabled,

    #[error("session is poisoned by an earlier error")]
    Poisoned,

    #[error("{0}")]
    Corruption(Box<ScoreCorruption>),
}

pub type BuildResult<T> = Result<T, BuildError>;
pub type ScoreResult<T> = Result<T, ScoreError>;
