//! Payload fingerprints recorded with each ledger entry.
//!
//! A replayed token whose payload fingerprint differs from the recorded one
//! is still answered idempotently, but the mismatch is logged so client bugs
//! that reuse tokens surface in operations.

use std::fmt;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::BoardDocument;

/// Errors raised when decoding a stored fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadFingerprintError {
    /// The stored value had the wrong byte length.
    #[error("payload fingerprint must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        actual: usize,
    },
}

/// SHA-256 over the canonical JSON form of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PayloadFingerprint([u8; 32]);

impl PayloadFingerprint {
    /// Fingerprint a normalized document.
    ///
    /// Object keys are sorted recursively first, so semantically equal
    /// documents share a fingerprint regardless of submission key order.
    pub fn of(document: &BoardDocument) -> Self {
        let canonical = canonicalize(&document.to_value()).to_string();
        Self(Sha256::digest(canonical.as_bytes()).into())
    }

    /// Rebuild a fingerprint from stored bytes.
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, PayloadFingerprintError> {
        let arr: [u8; 32] =
            bytes
                .try_into()
                .map_err(|_| PayloadFingerprintError::InvalidLength {
                    expected: 32,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(fields) => {
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                if let Some(inner) = fields.get(key) {
                    sorted.insert(key.clone(), canonicalize(inner));
                }
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

impl fmt::Display for PayloadFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
