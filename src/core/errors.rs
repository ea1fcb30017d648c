use crate::core::register::Representation;
use thiserror::Error;

/// Precondition violations detected at the call site, before any mutation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("qubit index {index} out of range, register has {size} qubits")]
    QubitOutOfRange { index: usize, size: usize },

    #[error("'count' must be greater than 0 and 'qbit + count' must fit in the {size}-qubit register (qbit: {qbit}, count: {count})")]
    CountOutOfRange {
        qbit: usize,
        count: usize,
        size: usize,
    },

    #[error("'control' must have at least one item")]
    EmptyControls,

    #[error("control index {index} out of range, register has {size} qubits")]
    ControlOutOfRange { index: usize, size: usize },

    #[error("duplicate qubit index found: {0}")]
    DuplicateQubit(usize),

    #[error("qubit {0} cannot be both control and target")]
    ControlTargetOverlap(usize),

    #[error("gate must be 'X', 'Y' or 'Z', got '{0}'")]
    NotPauli(char),

    #[error("unknown gate '{0}'")]
    UnknownGate(char),

    #[error("unknown gate \"{0}\"")]
    UnknownNamedGate(String),

    #[error("unknown representation \"{0}\"")]
    UnknownRepresentation(String),

    #[error("abs(phase) must be equal to 1, got {0}")]
    PhaseNotUnit(f64),

    #[error("probability must be in the range 0.0 to 1.0, got {0}")]
    ProbabilityOutOfRange(f64),

    #[error("'begin' must be less than 'end' and both must fit in the {size}-qubit register (begin: {begin}, end: {end})")]
    EmptyRange {
        begin: usize,
        end: usize,
        size: usize,
    },

    #[error("initial state {init} does not fit in {count} qubits")]
    InitOutOfRange { init: u64, count: usize },

    #[error("register of {0} qubits exceeds the supported maximum of 30")]
    TooManyQubits(usize),

    #[error("matrix is not unitary (U†U != I)")]
    NonUnitary,

    #[error("matrix must be square")]
    NotSquareMatrix,

    #[error("matrix dimensions must be a power of two")]
    InvalidDimensions,

    #[error("'rows', 'cols' and 'values' must have the same length")]
    CoordinateCountMismatch,

    #[error("coordinate index {index} out of range for dimension {dim}")]
    CoordinateOutOfRange { index: usize, dim: usize },

    #[error("number of Kraus operators ({ops}) does not match number of probabilities ({probs})")]
    KrausCountMismatch { ops: usize, probs: usize },

    #[error("all Kraus operators must have the same length")]
    KrausLengthMismatch,

    #[error("Kraus probabilities must sum to 1.0, got {0}")]
    KrausProbabilitySum(f64),
}

/// Operation requires a state representation the register is not in.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("representation must be \"{required}\" for this operation, register is \"{actual}\"")]
    RepresentationRequired {
        required: Representation,
        actual: Representation,
    },

    #[error("cannot convert a \"{from}\" state to \"{to}\"")]
    UnsupportedConversion {
        from: Representation,
        to: Representation,
    },
}

/// Structural misuse of the register lifecycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LogicError {
    #[error("there are no ancillas on the system")]
    NoAncillas,

    #[error("there are already ancillas in the system, remove them before adding more")]
    AncillasPresent,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ArgumentError),

    #[error("invalid state: {0}")]
    InvalidState(#[from] StateError),

    #[error("logic error: {0}")]
    Logic(#[from] LogicError),
}

pub type Result<T> = std::result::Result<T, Error>;
