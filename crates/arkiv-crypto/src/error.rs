//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur during digest operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The digest algorithm name is not supported.
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Invalid digest length for the algorithm.
    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidDigestLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid hex encoding.
    #[error("invalid hex encoding")]
    InvalidHexEncoding,

    /// Invalid base64 encoding.
    #[error("invalid base64 encoding")]
    InvalidBase64Encoding,

    /// A document could not be serialized for hashing.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
