//! Error types for the register-access core

use thiserror::Error;

/// Result type alias for register-access operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
///
/// Callers that only care whether the hardware misbehaved, the request was
/// wrong, or the chip lacks the feature can match on this instead of the
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller supplied an invalid parameter
    BadParam,
    /// Hardware or transport did not respond correctly
    Fail,
    /// The operation is not implemented by the target chip
    NotSupported,
}

/// Main error type for register access
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter error
    #[error("Invalid parameter '{name}': {reason}")]
    BadParam { name: String, reason: String },

    /// Busy bit never cleared within the poll budget
    #[error("{block}: busy bit still set after {polls} polls")]
    Timeout { block: String, polls: u32 },

    /// A response carried the wrong sequence number
    #[error("Sequence mismatch: expected {expected}, got {actual}")]
    SequenceMismatch { expected: u8, actual: u8 },

    /// Protocol-level error (unexpected response code, no response, ...)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Response or table dump could not be parsed
    #[error("Packet parsing error: {0}")]
    PacketParsing(String),

    /// Transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Network I/O error
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Opcode or block not implemented by the chip
    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl Error {
    /// Create an invalid parameter error
    pub fn bad_param<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Error::BadParam {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a protocol error with a custom message
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create a parsing error with a custom message
    pub fn parsing<S: Into<String>>(msg: S) -> Self {
        Error::PacketParsing(msg.into())
    }

    /// Create a transport error with a custom message
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Error::Transport(msg.into())
    }

    /// Create a not-supported error with a custom message
    pub fn not_supported<S: Into<String>>(msg: S) -> Self {
        Error::NotSupported(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadParam { .. } => ErrorKind::BadParam,
            Error::NotSupported(_) => ErrorKind::NotSupported,
            Error::Timeout { .. }
            | Error::SequenceMismatch { .. }
            | Error::Protocol(_)
            | Error::PacketParsing(_)
            | Error::Transport(_)
            | Error::Io(_) => ErrorKind::Fail,
        }
    }
}
