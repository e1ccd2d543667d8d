//! Evidence audit error types.

use arkiv_core::StatusCode;
use thiserror::Error;

/// Errors raised while auditing an entity.
///
/// [`Verdict`](Self::Verdict) ends a run early with a graded outcome; it is
/// turned into an [`AuditRunResult`](crate::AuditRunResult) and never
/// escapes [`EvidenceAuditService::audit`](crate::EvidenceAuditService::audit).
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// The caller passed an unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A check concluded the run with `WARNING`, `KO` or `FATAL`.
    #[error("{status}: {message}")]
    Verdict {
        /// Outcome of the run.
        status: StatusCode,
        /// Why the run ended.
        message: String,
    },
}

impl EvidenceError {
    /// A `WARNING` verdict.
    #[must_use]
    pub fn warn(message: impl Into<String>) -> Self {
        Self::Verdict {
            status: StatusCode::Warning,
            message: message.into(),
        }
    }

    /// A `KO` verdict.
    #[must_use]
    pub fn ko(message: impl Into<String>) -> Self {
        Self::Verdict {
            status: StatusCode::Ko,
            message: message.into(),
        }
    }

    /// A `FATAL` verdict.
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Verdict {
            status: StatusCode::Fatal,
            message: message.into(),
        }
    }

    /// A `FATAL` verdict keeping the message of the underlying failure.
    #[must_use]
    pub fn fatal_from(context: &str, cause: impl std::fmt::Display) -> Self {
        Self::fatal(format!("{context}: {cause}"))
    }
}

/// Result type for evidence audit operations.
pub type EvidenceResult<T> = Result<T, EvidenceError>;
