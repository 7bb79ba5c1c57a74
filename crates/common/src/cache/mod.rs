//! Client-side caches
//!
//! Both caches are an optimization only. Storage failures are logged and
//! reported as a miss, so deriving fresh from a new wallet signature is always
//! possible. Expiry is checked lazily on read.

mod public_key;
mod signature;
mod store;

pub use public_key::{CachedPublicKeyEntry, PublicKeyCache};
pub use signature::{
    restore_key_pair, CachedSignatureRecord, SignatureCache, SIGNATURE_CACHE_NAMESPACE,
};
pub use store::{FileStore, KeyValueStore, MemoryStore};

/// How long a cached signature or public key stays valid
pub const DEFAULT_CACHE_TTL_HOURS: i64 = 24;

/// Storage failure inside a cache. Never escapes the cache boundary.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache storage unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid cache key: {0}")]
    InvalidKey(String),
}
