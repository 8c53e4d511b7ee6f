//! Domain errors
//!
//! Errors raised by the search core. The binary wraps these in `anyhow::Error`
//! and maps them to exit codes in `main`.

use thiserror::Error;

/// Errors produced by partitioning, evaluation and argument validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Missing, malformed or out-of-range input (`N`, `k`, unit size, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Sum of squares no longer fits the evaluation integer type
    #[error("sum of {k} squares starting at {start} overflows u128")]
    Overflow { start: u64, k: u64 },

    /// A single candidate evaluation failed inside a worker
    #[error("worker fault in unit {unit_id} at candidate {candidate}: {reason}")]
    WorkerFault {
        unit_id: usize,
        candidate: u64,
        reason: String,
    },

    /// Partitioner produced overlapping or gapped units
    #[error("partition violation: {0}")]
    PartitionViolation(String),
}

impl SearchError {
    /// Shorthand for building an `InvalidArgument`
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
