//! Content-addressed storage for encrypted file blobs
//!
//! Blobs are addressed by CIDv1 (raw codec, sha2-256). Only ciphertext is ever
//! handed to a store.

mod fs;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use multihash::Multihash;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

use crate::crypto::sha256;

/// Multicodec code for raw bytes
pub const RAW_CODEC: u64 = 0x55;
/// Multihash code for sha2-256
pub const SHA2_256_CODE: u64 = 0x12;

/// Errors that can occur when using a blob store.
#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("blob {0} does not match its content address")]
    Corrupted(Cid),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unhandled blob store error: {0}")]
    Default(#[from] anyhow::Error),
}

/// CIDv1 of `data` under the raw codec
pub fn content_address(data: &[u8]) -> Cid {
    let digest = sha256(data);
    let mh = Multihash::<64>::wrap(SHA2_256_CODE, &digest)
        .expect("sha2-256 digest fits in a 64-byte multihash");
    Cid::new_v1(RAW_CODEC, mh)
}

#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Store bytes, returning their content address
    async fn put(&self, data: Bytes) -> Result<Cid, BlobStoreError>;

    /// Get bytes by content address, `None` if absent
    async fn get(&self, cid: &Cid) -> Result<Option<Bytes>, BlobStoreError>;

    async fn has(&self, cid: &Cid) -> Result<bool, BlobStoreError>;

    /// Returns `true` if the blob was deleted, `false` if it didn't exist.
    async fn delete(&self, cid: &Cid) -> Result<bool, BlobStoreError>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_content_address_layout() {
        let cid = content_address(b"hello world");
        assert_eq!(cid.version(), cid::Version::V1);
        assert_eq!(cid.codec(), RAW_CODEC);
        assert_eq!(cid.hash().code(), SHA2_256_CODE);
        assert_eq!(cid.hash().digest(), sha256(b"hello world").as_slice());
        // raw + sha2-256 CIDv1 in base32
        assert!(cid.to_string().starts_with("bafkrei"));
    }

    #[test]
    fn test_content_address_is_deterministic() {
        assert_eq!(content_address(b"abc"), content_address(b"abc"));
        assert_ne!(content_address(b"abc"), content_address(b"abd"));
    }
}
