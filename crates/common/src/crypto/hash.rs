//! Content hashing for tamper detection and IP timestamping
//!
//! A `DocumentHash` is the SHA-256 digest of a file's plaintext. It is what
//! gets sealed on the ledger by the IP-seal module, and what a downloader
//! compares against to detect tampering.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::encoding::{self, EncodingError};
use super::kdf::{sha256, SHA256_SIZE};

/// SHA-256 digest of a document's contents
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DocumentHash([u8; SHA256_SIZE]);

impl DocumentHash {
    pub fn compute(data: &[u8]) -> Self {
        Self(sha256(data))
    }

    /// Parse a digest from hex, with or without a `0x` prefix
    pub fn from_hex(hex: &str) -> Result<Self, EncodingError> {
        Ok(Self(encoding::from_hex_array(hex)?))
    }

    pub fn to_hex(&self) -> String {
        encoding::to_hex(self.0)
    }

    /// The raw 32 bytes, as consumed by the ledger's `bytes32` arguments
    pub fn to_bytes(&self) -> [u8; SHA256_SIZE] {
        self.0
    }

    /// Check `data` against this digest
    pub fn matches(&self, data: &[u8]) -> bool {
        Self::compute(data) == *self
    }
}

impl From<[u8; SHA256_SIZE]> for DocumentHash {
    fn from(bytes: [u8; SHA256_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for DocumentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<DocumentHash> for String {
    fn from(hash: DocumentHash) -> Self {
        hash.to_hex()
    }
}

impl TryFrom<String> for DocumentHash {
    type Error = EncodingError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

/// Hex-encoded SHA-256 of `data`
pub fn hash(data: &[u8]) -> String {
    DocumentHash::compute(data).to_hex()
}

/// Compare the digest of `data` against an expected hex digest.
///
/// Comparison is case-insensitive and ignores a `0x` prefix; malformed hex
/// never verifies.
pub fn verify(data: &[u8], expected_hex: &str) -> bool {
    DocumentHash::from_hex(expected_hex)
        .map(|expected| expected.matches(data))
        .unwrap_or(false)
}
