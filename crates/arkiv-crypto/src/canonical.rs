//! Canonical JSON serialization for document digests.
//!
//! A document's digest is computed over its compact JSON form with object
//! keys sorted lexicographically at every depth. Two documents that differ
//! only in key order therefore produce the same digest.

use serde_json::{Map, Value};

use crate::digest::{Digest, DigestType};

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::with_capacity(map.len());
            for key in keys {
                if let Some(v) = map.get(key) {
                    out.insert(key.clone(), sorted(v));
                }
            }
            Value::Object(out)
        },
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Serialize a JSON document in canonical form.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    sorted(value).to_string()
}

/// Digest a JSON document over its canonical form.
#[must_use]
pub fn digest_json(algorithm: DigestType, value: &Value) -> Digest {
    Digest::compute(algorithm, canonical_json(value).as_bytes())
}
