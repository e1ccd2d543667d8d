//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arkiv_crypto::prelude::*;` to import all essential types.

pub use crate::{CryptoError, CryptoResult};

pub use crate::{Digest, DigestReader, DigestType, Hasher};

pub use crate::{canonical_json, digest_json};
