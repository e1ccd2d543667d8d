//! Digest algorithms and values.
//!
//! Sealed ledgers record digests as base64 strings ("digest64"); the algorithm
//! name travels alongside the digest in the sealing operation's detail.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use crate::error::{CryptoError, CryptoResult};

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DigestType {
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512, the default for sealed archives.
    #[default]
    Sha512,
    /// BLAKE3.
    Blake3,
}

impl DigestType {
    /// Canonical algorithm name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::Blake3 => "BLAKE3",
        }
    }

    /// Output length in bytes.
    #[must_use]
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha256 | Self::Blake3 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

impl fmt::Display for DigestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestType {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "SHA256" => Ok(Self::Sha256),
            "SHA384" => Ok(Self::Sha384),
            "SHA512" => Ok(Self::Sha512),
            "BLAKE3" => Ok(Self::Blake3),
            _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl Serialize for DigestType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for DigestType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Incremental hasher over any [`DigestType`].
#[derive(Clone)]
pub enum Hasher {
    /// SHA-256 state.
    Sha256(sha2::Sha256),
    /// SHA-384 state.
    Sha384(sha2::Sha384),
    /// SHA-512 state.
    Sha512(sha2::Sha512),
    /// BLAKE3 state.
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    /// Start hashing with the given algorithm.
    #[must_use]
    pub fn new(algorithm: DigestType) -> Self {
        match algorithm {
            DigestType::Sha256 => Self::Sha256(sha2::Sha256::new()),
            DigestType::Sha384 => Self::Sha384(sha2::Sha384::new()),
            DigestType::Sha512 => Self::Sha512(sha2::Sha512::new()),
            DigestType::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    /// Feed bytes into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Sha384(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            },
        }
    }

    /// Finish and produce the digest.
    #[must_use]
    pub fn finalize(self) -> Digest {
        match self {
            Self::Sha256(h) => Digest::new(DigestType::Sha256, h.finalize().to_vec()),
            Self::Sha384(h) => Digest::new(DigestType::Sha384, h.finalize().to_vec()),
            Self::Sha512(h) => Digest::new(DigestType::Sha512, h.finalize().to_vec()),
            Self::Blake3(h) => Digest::new(DigestType::Blake3, h.finalize().as_bytes().to_vec()),
        }
    }
}

impl fmt::Debug for Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let algorithm = match self {
            Self::Sha256(_) => DigestType::Sha256,
            Self::Sha384(_) => DigestType::Sha384,
            Self::Sha512(_) => DigestType::Sha512,
            Self::Blake3(_) => DigestType::Blake3,
        };
        f.debug_struct("Hasher")
            .field("algorithm", &algorithm)
            .finish_non_exhaustive()
    }
}

/// A computed digest.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: DigestType,
    bytes: Vec<u8>,
}

impl Digest {
    fn new(algorithm: DigestType, bytes: Vec<u8>) -> Self {
        Self { algorithm, bytes }
    }

    /// Hash data in one call.
    #[must_use]
    pub fn compute(algorithm: DigestType, data: &[u8]) -> Self {
        let mut hasher = Hasher::new(algorithm);
        hasher.update(data);
        hasher.finalize()
    }

    /// Decode a base64 digest.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid base64 or has the wrong
    /// length for the algorithm.
    pub fn from_base64(algorithm: DigestType, s: &str) -> CryptoResult<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|_| CryptoError::InvalidBase64Encoding)?;
        Self::from_bytes(algorithm, bytes)
    }

    /// Decode a hex digest.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex or has the wrong
    /// length for the algorithm.
    pub fn from_hex(algorithm: DigestType, s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidHexEncoding)?;
        Self::from_bytes(algorithm, bytes)
    }

    fn from_bytes(algorithm: DigestType, bytes: Vec<u8>) -> CryptoResult<Self> {
        if bytes.len() != algorithm.output_len() {
            return Err(CryptoError::InvalidDigestLength {
                expected: algorithm.output_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self::new(algorithm, bytes))
    }

    /// The algorithm that produced this digest.
    #[must_use]
    pub fn algorithm(&self) -> DigestType {
        self.algorithm
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encode as base64 ("digest64").
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// Encode as lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Compare against a recorded digest, accepting base64 or hex.
    #[must_use]
    pub fn matches_encoded(&self, recorded: &str) -> bool {
        self.matches_base64(recorded) || self.to_hex().eq_ignore_ascii_case(recorded)
    }

    /// Compare against a recorded base64 digest.
    #[must_use]
    pub fn matches_base64(&self, recorded: &str) -> bool {
        self.to_base64() == recorded
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Digest({}:{})", self.algorithm, hex.get(..16).unwrap_or(&hex))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
