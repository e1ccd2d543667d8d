//! Reconstruction error types.

use thiserror::Error;

/// Errors that can occur while rebuilding stores from backups.
#[derive(Debug, Error)]
pub enum ReconstructionError {
    /// The request is malformed. Never reported as a KO verdict.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A backend could not be reached or rejected a write.
    #[error("reconstruction failure: {0}")]
    Runtime(String),

    /// One backup object cannot be used; the entry is skipped.
    #[error("unusable backup {object}: {reason}")]
    Snapshot {
        /// Name of the backup object.
        object: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Result type for reconstruction operations.
pub type ReconstructionResult<T> = Result<T, ReconstructionError>;
