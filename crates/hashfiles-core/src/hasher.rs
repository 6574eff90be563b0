//! Content digests - BLAKE3 fingerprints of serialized asset bytes
//!
//! The digest of an asset is always derived from its current serialized
//! form, so it changes as soon as the asset's own bytes or any URL it embeds
//! change. Nothing is cached.

use serde::{Serialize, Serializer};
use std::fmt;

/// Hex characters of the digest embedded in hashed file names.
pub const FINGERPRINT_LEN: usize = 10;

/// BLAKE3 digest of an asset's serialized bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest(blake3::Hash);

impl ContentDigest {
    /// Hash a byte slice.
    pub fn of(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes))
    }

    /// Full 64-char lowercase hex digest.
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    /// First `len` hex characters (capped at the full digest length).
    pub fn prefix(&self, len: usize) -> String {
        let hex = self.0.to_hex();
        hex[..len.min(hex.len())].to_string()
    }

    /// Fingerprint used in hashed file names (`main.0123456789.js`).
    pub fn fingerprint(&self) -> String {
        self.prefix(FINGERPRINT_LEN)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.to_hex().as_str())
    }
}
