//! Core error types.

use thiserror::Error;

/// Errors raised while building or parsing core values.
///
/// These are programming errors: the caller supplied a value the
/// subsystem does not know how to handle.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An argument was missing or outside its accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A kind or collection name was not recognized.
    #[error("unknown {kind}: {value}")]
    UnknownName {
        /// What was being parsed (e.g. "entity kind").
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A timestamp could not be parsed.
    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp {
        /// The rejected value.
        value: String,
        /// Parser message.
        reason: String,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
