use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{CacheError, KeyValueStore, DEFAULT_CACHE_TTL_HOURS};
use crate::crypto::{
    derive_key_pair, DerivationMetadata, KeyDerivationError, KeyPairBundle, KeyVersion,
    WalletSignature,
};

/// Prefix of every signature cache key
pub const SIGNATURE_CACHE_NAMESPACE: &str = "securedag_key_derivation";

/// A wallet signature plus what is needed to rebuild the message it signed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSignatureRecord {
    pub signature: WalletSignature,
    pub key_version: KeyVersion,
    pub cached_at: DateTime<Utc>,
    pub user_address: String,
    pub metadata: DerivationMetadata,
    pub issued_at: String,
    pub nonce: String,
}

impl CachedSignatureRecord {
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.cached_at > ttl
    }
}

/// Re-derive the key bundle from a cached signature without prompting the wallet
pub fn restore_key_pair(
    record: &CachedSignatureRecord,
) -> Result<KeyPairBundle, KeyDerivationError> {
    derive_key_pair(&record.signature, record.key_version)
}

/// Signature cache keyed by `(user_address, key_version)`
///
/// Every operation is best-effort: failures are logged and never returned.
#[derive(Debug, Clone)]
pub struct SignatureCache<S> {
    store: S,
    ttl: Duration,
}

impl<S: KeyValueStore> SignatureCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_ttl(store, Duration::hours(DEFAULT_CACHE_TTL_HOURS))
    }

    pub fn with_ttl(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// `<namespace>_<user_address>_v<key_version>`
    pub fn storage_key(user_address: &str, key_version: KeyVersion) -> String {
        format!(
            "{}_{}_v{}",
            SIGNATURE_CACHE_NAMESPACE, user_address, key_version
        )
    }

    pub fn cache(
        &self,
        user_address: &str,
        signature: &WalletSignature,
        key_version: KeyVersion,
        metadata: &DerivationMetadata,
    ) {
        let record = CachedSignatureRecord {
            signature: signature.clone(),
            key_version,
            cached_at: Utc::now(),
            user_address: user_address.to_string(),
            metadata: metadata.clone(),
            issued_at: metadata.issued_at.clone(),
            nonce: metadata.nonce.clone(),
        };
        let key = Self::storage_key(user_address, key_version);
        if let Err(e) = self.put(&key, &record) {
            tracing::warn!("failed to cache key derivation signature: {}", e);
        }
    }

    /// The cached record, unless absent, unreadable or older than the TTL.
    ///
    /// Expired and unreadable records are deleted as a side effect.
    pub fn get(&self, user_address: &str, key_version: KeyVersion) -> Option<CachedSignatureRecord> {
        let key = Self::storage_key(user_address, key_version);
        let record = match self.fetch(&key) {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("failed to read cached key derivation signature: {}", e);
                self.remove(&key);
                return None;
            }
        };

        if record.is_expired(Utc::now(), self.ttl) {
            tracing::debug!(user_address, %key_version, "cached signature expired");
            self.remove(&key);
            return None;
        }
        Some(record)
    }

    pub fn clear(&self, user_address: &str, key_version: KeyVersion) {
        self.remove(&Self::storage_key(user_address, key_version));
    }

    fn put(&self, key: &str, record: &CachedSignatureRecord) -> Result<(), CacheError> {
        self.store.set(key, serde_json::to_string(record)?)
    }

    fn fetch(&self, key: &str) -> Result<Option<CachedSignatureRecord>, CacheError> {
        match self.store.get(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::warn!("failed to clear cached key derivation signature: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::cache::MemoryStore;
    use crate::crypto::{build_message, MessageOptions};

    const ADDRESS: &str = "0x00000000000000000000000000000000000000aa";

    fn signature() -> WalletSignature {
        WalletSignature::from_hex("0xdeadbeef").unwrap()
    }

    fn metadata() -> DerivationMetadata {
        build_message(ADDRESS, 296, KeyVersion::CURRENT, MessageOptions::default()).metadata
    }

    #[test]
    fn test_storage_key_layout() {
        assert_eq!(
            SignatureCache::<MemoryStore>::storage_key(ADDRESS, KeyVersion::new(2).unwrap()),
            format!("securedag_key_derivation_{}_v2", ADDRESS)
        );
    }

    #[test]
    fn test_cache_get_clear() {
        let cache = SignatureCache::new(MemoryStore::new());
        assert!(cache.get(ADDRESS, KeyVersion::CURRENT).is_none());

        cache.cache(ADDRESS, &signature(), KeyVersion::CURRENT, &metadata());
        let record = cache.get(ADDRESS, KeyVersion::CURRENT).unwrap();
        assert_eq!(record.signature, signature());
        assert_eq!(record.metadata, metadata());
        assert_eq!(record.nonce, "0");
        assert_eq!(record.issued_at, metadata().issued_at);

        // scoped by version
        assert!(cache.get(ADDRESS, KeyVersion::new(2).unwrap()).is_none());

        cache.clear(ADDRESS, KeyVersion::CURRENT);
        assert!(cache.get(ADDRESS, KeyVersion::CURRENT).is_none());
    }

    #[test]
    fn test_expired_record_is_removed() {
        let store = MemoryStore::new();
        let cache = SignatureCache::new(store.clone());

        let record = CachedSignatureRecord {
            signature: signature(),
            key_version: KeyVersion::CURRENT,
            cached_at: Utc::now() - Duration::hours(25),
            user_address: ADDRESS.to_string(),
            metadata: metadata(),
            issued_at: metadata().issued_at,
            nonce: metadata().nonce,
        };
        let key = SignatureCache::<MemoryStore>::storage_key(ADDRESS, KeyVersion::CURRENT);
        store
            .set(&key, serde_json::to_string(&record).unwrap())
            .unwrap();

        assert!(cache.get(ADDRESS, KeyVersion::CURRENT).is_none());
        assert_eq!(store.get(&key).unwrap(), None);
    }

    #[test]
    fn test_fresh_record_within_ttl() {
        let record = CachedSignatureRecord {
            signature: signature(),
            key_version: KeyVersion::CURRENT,
            cached_at: Utc::now() - Duration::hours(23),
            user_address: ADDRESS.to_string(),
            metadata: metadata(),
            issued_at: metadata().issued_at,
            nonce: metadata().nonce,
        };
        assert!(!record.is_expired(Utc::now(), Duration::hours(24)));
        assert!(record.is_expired(Utc::now() + Duration::hours(2), Duration::hours(24)));
    }

    #[test]
    fn test_restore_matches_fresh_derivation() {
        let cache = SignatureCache::new(MemoryStore::new());
        cache.cache(ADDRESS, &signature(), KeyVersion::CURRENT, &metadata());
        let record = cache.get(ADDRESS, KeyVersion::CURRENT).unwrap();

        let restored = restore_key_pair(&record).unwrap();
        let fresh = derive_key_pair(&signature(), KeyVersion::CURRENT).unwrap();
        assert_eq!(
            restored.encryption_public_key(),
            fresh.encryption_public_key()
        );
        assert_eq!(restored.version(), KeyVersion::CURRENT);
    }

    #[test]
    fn test_corrupt_record_is_a_miss() {
        let store = MemoryStore::new();
        let cache = SignatureCache::new(store.clone());
        let key = SignatureCache::<MemoryStore>::storage_key(ADDRESS, KeyVersion::CURRENT);
        store.set(&key, "{not json".to_string()).unwrap();

        assert!(cache.get(ADDRESS, KeyVersion::CURRENT).is_none());
        assert_eq!(store.get(&key).unwrap(), None);
    }

    #[test]
    fn test_persisted_json_layout() {
        let store = MemoryStore::new();
        let cache = SignatureCache::new(store.clone());
        cache.cache(ADDRESS, &signature(), KeyVersion::CURRENT, &metadata());

        let key = SignatureCache::<MemoryStore>::storage_key(ADDRESS, KeyVersion::CURRENT);
        let json: serde_json::Value =
            serde_json::from_str(&store.get(&key).unwrap().unwrap()).unwrap();
        assert_eq!(json["signature"], "0xdeadbeef");
        assert_eq!(json["keyVersion"], 1);
        assert_eq!(json["userAddress"], ADDRESS);
        assert!(json["cachedAt"].is_string());
        assert_eq!(json["metadata"]["chainId"], 296);
    }

    /// A store whose every operation fails
    #[derive(Debug, Default)]
    struct BrokenStore {
        touched: AtomicBool,
    }

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            self.touched.store(true, Ordering::SeqCst);
            Err(CacheError::Io(std::io::Error::other("quota exceeded")))
        }

        fn set(&self, _key: &str, _value: String) -> Result<(), CacheError> {
            self.touched.store(true, Ordering::SeqCst);
            Err(CacheError::Io(std::io::Error::other("quota exceeded")))
        }

        fn remove(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Io(std::io::Error::other("quota exceeded")))
        }
    }

    #[test]
    fn test_storage_failures_degrade_to_miss() {
        let cache = SignatureCache::new(BrokenStore::default());
        cache.cache(ADDRESS, &signature(), KeyVersion::CURRENT, &metadata());
        assert!(cache.get(ADDRESS, KeyVersion::CURRENT).is_none());
        cache.clear(ADDRESS, KeyVersion::CURRENT);
        assert!(cache.store().touched.load(Ordering::SeqCst));
    }
}
