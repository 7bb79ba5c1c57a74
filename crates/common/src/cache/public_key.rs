use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use super::DEFAULT_CACHE_TTL_HOURS;
use crate::crypto::EncryptionPublicKey;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedPublicKeyEntry {
    pub public_key: EncryptionPublicKey,
    pub cached_at: DateTime<Utc>,
}

/// Lookups of other users' encryption public keys, keyed case-insensitively
/// by address
#[derive(Clone, Debug)]
pub struct PublicKeyCache {
    inner: Arc<RwLock<HashMap<String, CachedPublicKeyEntry>>>,
    ttl: Duration,
}

impl Default for PublicKeyCache {
    fn default() -> Self {
        Self::with_ttl(Duration::hours(DEFAULT_CACHE_TTL_HOURS))
    }
}

impl PublicKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    fn key(address: &str) -> String {
        address.to_lowercase()
    }

    pub fn cache(&self, address: &str, public_key: EncryptionPublicKey) {
        self.insert_at(address, public_key, Utc::now());
    }

    pub(crate) fn insert_at(
        &self,
        address: &str,
        public_key: EncryptionPublicKey,
        cached_at: DateTime<Utc>,
    ) {
        self.inner.write().insert(
            Self::key(address),
            CachedPublicKeyEntry {
                public_key,
                cached_at,
            },
        );
    }

    /// The cached key, unless absent or expired. Expired entries are dropped.
    pub fn get(&self, address: &str) -> Option<EncryptionPublicKey> {
        let key = Self::key(address);
        let entry = self.inner.read().get(&key).cloned()?;
        if Utc::now() - entry.cached_at > self.ttl {
            tracing::debug!(address, "cached public key expired");
            self.inner.write().remove(&key);
            return None;
        }
        Some(entry.public_key)
    }

    pub fn remove(&self, address: &str) {
        self.inner.write().remove(&Self::key(address));
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
