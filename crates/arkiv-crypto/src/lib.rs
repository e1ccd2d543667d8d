//! Arkiv Crypto - digest primitives for evidence verification.
//!
//! This crate provides:
//! - [`DigestType`]: the supported algorithms (SHA-256/384/512, BLAKE3)
//! - [`Digest`]: a computed digest rendered as base64 ("digest64") or hex
//! - [`Hasher`]: incremental hashing over any supported algorithm
//! - [`DigestReader`]: a [`std::io::Read`] adapter that hashes bytes in-stream
//! - [`canonical_json`]: the stable serialization that document digests are
//!   computed over
//!
//! # Example
//!
//! ```
//! use arkiv_crypto::{Digest, DigestType};
//!
//! let digest = Digest::compute(DigestType::Sha512, b"sealed ledger");
//! assert_eq!(digest.algorithm(), DigestType::Sha512);
//! assert!(digest.matches_base64(&digest.to_base64()));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod canonical;
mod digest;
mod error;
mod reader;

pub use canonical::{canonical_json, digest_json};
pub use digest::{Digest, DigestType, Hasher};
pub use error::{CryptoError, CryptoResult};
pub use reader::DigestReader;
