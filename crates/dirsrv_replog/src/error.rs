//! Error types for the replication log.

use thiserror::Error;

/// Result type for replication log operations.
pub type ReplogResult<T> = Result<T, ReplogError>;

/// Errors raised by a replication sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing the record failed.
    #[error("sink io error: {0}")]
    Io(#[from] std::io::Error),

    /// The sink refused the record.
    #[error("sink rejected record: {0}")]
    Rejected(String),
}

impl SinkError {
    /// Creates a rejection.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// Errors raised by the log and the replog reader.
#[derive(Debug, Error)]
pub enum ReplogError {
    /// I/O failure opening or reading a replog.
    #[error("replog io error: {0}")]
    Io(#[from] std::io::Error),

    /// Opening the sink failed.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The log has been shut down.
    #[error("replication log is shut down")]
    Closed,

    /// A commit sequence was submitted twice or after it was passed.
    #[error("stale sequence {sequence} for backend {backend} (next is {next})")]
    StaleSequence {
        /// Backend id.
        backend: String,
        /// Submitted sequence.
        sequence: u64,
        /// Next sequence the log expects.
        next: u64,
    },

    /// Malformed replog text.
    #[error("replog parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },
}

impl ReplogError {
    /// Creates a parse error.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}
