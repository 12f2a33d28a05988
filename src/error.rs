//! Error types for plant setup and data exchange.
//!
//! Setup errors are fatal: they are returned before any scenario runs.
//! Impossible engine states are not represented here; those panic.

use thiserror::Error;

/// A configuration problem that prevents the simulation from starting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SetupError {
    #[error("component name \"{0}\" is reserved for maintenance events")]
    ReservedName(String),

    #[error("duplicate component name \"{0}\"")]
    DuplicateComponent(String),

    #[error("unknown component \"{0}\"")]
    UnknownComponent(String),

    #[error("{table} condenser efficiency table has {found} entries, expected {expected} (trains + 1)")]
    CondenserTable {
        table: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("malformed component record {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("unknown operating mode \"{0}\"")]
    UnknownMode(String),

    #[error("unknown repair policy \"{0}\"")]
    UnknownPolicy(String),

    #[error("unknown component type \"{0}\"")]
    UnknownKind(String),

    #[error("failure type \"{failure}\" on {component}: {reason}")]
    ModeMismatch {
        component: String,
        failure: String,
        reason: String,
    },

    #[error("status for {component} has {found} lifetimes, expected {expected}")]
    StatusMismatch {
        component: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid component parameter: {0}")]
    InvalidComponent(String),

    #[error("invalid distribution parameters: {0}")]
    InvalidDistribution(String),

    #[error("dispatch series \"{series}\" has {found} steps, expected {expected}")]
    DispatchLength {
        series: &'static str,
        expected: usize,
        found: usize,
    },
}

pub type SetupResult<T> = Result<T, SetupError>;

/// Failure while reading or writing simulation data files.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Setup(#[from] SetupError),
}
