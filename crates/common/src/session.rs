//! Per-wallet connection state
//!
//! A [`Session`] is created when a wallet connects and consumed on disconnect.
//! It owns the derived key bundle and drives every flow that needs it:
//! deriving and registering keys, uploading, downloading, sharing and
//! sealing documents. Collaborators are passed in explicitly, nothing is
//! global.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use cid::Cid;
use parking_lot::RwLock;

use crate::blobs::{BlobStore, BlobStoreError};
use crate::cache::{
    restore_key_pair, KeyValueStore, PublicKeyCache, SignatureCache, DEFAULT_CACHE_TTL_HOURS,
};
use crate::crypto::{
    build_message, decrypt_file, derive_key_pair, encoding, encrypt_file, encrypt_file_key,
    DecryptionError, DerivationMessage, DocumentHash, EncryptedFileKey, EncryptionPublicKey,
    FileKey, KeyDerivationError, KeyError, KeyPairBundle, KeyVersion, MessageOptions,
    SecretError, SecretShareError, DEFAULT_DOMAIN,
};
use crate::ledger::{AccessInfo, Address, FileId, FileInfo, Ledger, LedgerError, ModuleKind};
use crate::wallet::{Wallet, WalletError};

/// Chain id used when none is configured
pub const DEFAULT_CHAIN_ID: u64 = 296;

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub chain_id: u64,
    pub domain: String,
    pub key_version: KeyVersion,
    pub cache_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            domain: DEFAULT_DOMAIN.to_string(),
            key_version: KeyVersion::CURRENT,
            cache_ttl: Duration::hours(DEFAULT_CACHE_TTL_HOURS),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("encryption keys have not been derived for this session")]
    KeysNotDerived,
    #[error("{0} has no encryption key registered")]
    RecipientKeyMissing(Address),
    #[error("registered public key for {0} is invalid: {1}")]
    InvalidPublicKey(Address, KeyError),
    #[error("blob {0} not found")]
    BlobNotFound(Cid),
    #[error("key derivation error: {0}")]
    KeyDerivation(#[from] KeyDerivationError),
    #[error("decryption error: {0}")]
    Decryption(#[from] DecryptionError),
    #[error("encryption error: {0}")]
    Secret(#[from] SecretError),
    #[error("file key sharing error: {0}")]
    SecretShare(#[from] SecretShareError),
    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("blob store error: {0}")]
    BlobStore(#[from] BlobStoreError),
}

/// What an upload produced
#[derive(Clone, Debug)]
pub struct UploadReceipt {
    pub file_id: FileId,
    pub cid: Cid,
    pub document_hash: DocumentHash,
    /// The owner's own sealed copy of the file key
    pub encrypted_file_key: EncryptedFileKey,
}

/// Where an unlocked key bundle came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// A live cached signature
    Cache,
    /// A fresh wallet signature
    Wallet,
}

/// The derivation message `address` signs under `config`
pub fn derivation_message(address: &Address, config: &SessionConfig) -> DerivationMessage {
    build_message(
        address.as_str(),
        config.chain_id,
        config.key_version,
        MessageOptions {
            domain: Some(config.domain.clone()),
            ..Default::default()
        },
    )
}

/// Rebuild the key bundle from a cached signature
///
/// A record that no longer yields keys is cleared and reported as a miss.
pub fn restore_keys<S: KeyValueStore>(
    signatures: &SignatureCache<S>,
    address: &Address,
    version: KeyVersion,
) -> Option<KeyPairBundle> {
    let record = signatures.get(address.as_str(), version)?;
    match restore_key_pair(&record) {
        Ok(bundle) => {
            tracing::debug!(address = %address, %version, "restored keys from cached signature");
            Some(bundle)
        }
        Err(e) => {
            tracing::warn!("cached signature could not be used, clearing: {}", e);
            signatures.clear(address.as_str(), version);
            None
        }
    }
}

/// Unlock `wallet`'s key bundle without touching the ledger
///
/// The wallet is only prompted when no live cached signature exists, and a
/// fresh signature is cached for next time.
pub async fn unlock_keys<S: KeyValueStore>(
    wallet: &dyn Wallet,
    signatures: &SignatureCache<S>,
    config: &SessionConfig,
) -> Result<(KeyPairBundle, KeySource), SessionError> {
    let address = wallet.address();
    let version = config.key_version;
    if let Some(bundle) = restore_keys(signatures, address, version) {
        return Ok((bundle, KeySource::Cache));
    }

    let message = derivation_message(address, config);
    let signature = wallet.sign_message(&message.message).await?;
    let bundle = derive_key_pair(&signature, version)?;
    signatures.cache(address.as_str(), &signature, version, &message.metadata);
    Ok((bundle, KeySource::Wallet))
}

pub struct Session {
    config: SessionConfig,
    wallet: Arc<dyn Wallet>,
    ledger: Arc<dyn Ledger>,
    blobs: Arc<dyn BlobStore>,
    signatures: SignatureCache<Arc<dyn KeyValueStore>>,
    public_keys: PublicKeyCache,
    keys: RwLock<Option<KeyPairBundle>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", self.wallet.address())
            .field("config", &self.config)
            .field("has_keys", &self.keys.read().is_some())
            .finish()
    }
}

impl Session {
    pub fn connect(
        config: SessionConfig,
        wallet: Arc<dyn Wallet>,
        ledger: Arc<dyn Ledger>,
        blobs: Arc<dyn BlobStore>,
        cache_store: Arc<dyn KeyValueStore>,
    ) -> Self {
        tracing::info!(address = %wallet.address(), chain_id = config.chain_id, "wallet connected");
        Self {
            signatures: SignatureCache::with_ttl(cache_store, config.cache_ttl),
            public_keys: PublicKeyCache::with_ttl(config.cache_ttl),
            keys: RwLock::new(None),
            config,
            wallet,
            ledger,
            blobs,
        }
    }

    pub fn address(&self) -> &Address {
        self.wallet.address()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The derived key bundle, if keys have been derived or restored
    pub fn keys(&self) -> Option<KeyPairBundle> {
        self.keys.read().clone()
    }

    fn require_keys(&self) -> Result<KeyPairBundle, SessionError> {
        self.keys().ok_or(SessionError::KeysNotDerived)
    }

    /// The message the wallet is asked to sign for this session's key version
    pub fn derivation_message(&self) -> DerivationMessage {
        derivation_message(self.address(), &self.config)
    }

    /// Restore keys from a cached signature without prompting the wallet
    ///
    /// Returns the encryption public key on success, `None` on any miss.
    pub fn restore_keys_from_cache(&self) -> Option<EncryptionPublicKey> {
        let bundle = restore_keys(&self.signatures, self.address(), self.config.key_version)?;
        let public_key = bundle.encryption_public_key();
        *self.keys.write() = Some(bundle);
        Some(public_key)
    }

    /// Derive keys (from cache or a fresh wallet signature) and make sure the
    /// ledger holds the matching encryption public key
    pub async fn derive_and_register_keys(&self) -> Result<EncryptionPublicKey, SessionError> {
        let (bundle, _) = unlock_keys(self.wallet.as_ref(), &self.signatures, &self.config).await?;
        let public_key = bundle.encryption_public_key();
        *self.keys.write() = Some(bundle);

        let address = self.address();
        let registered = self.ledger.get_encryption_key(address).await?;
        let needs_registration = match registered {
            Some(record) => {
                !record.is_active
                    || record.version != self.config.key_version
                    || EncryptionPublicKey::from_hex(&record.public_key)
                        .map_or(true, |existing| existing != public_key)
            }
            None => true,
        };

        if needs_registration {
            self.ledger
                .set_encryption_key(
                    address,
                    encoding::to_prefixed_hex(public_key.as_bytes()),
                    self.config.key_version,
                )
                .await?;
            tracing::info!(address = %address, "registered encryption public key");
        }
        Ok(public_key)
    }

    /// Another account's encryption public key, from cache or the ledger
    pub async fn public_key_of(
        &self,
        address: &Address,
    ) -> Result<EncryptionPublicKey, SessionError> {
        if let Some(public_key) = self.public_keys.get(address.as_str()) {
            return Ok(public_key);
        }

        let record = self
            .ledger
            .get_encryption_key(address)
            .await?
            .filter(|record| record.is_active)
            .ok_or_else(|| SessionError::RecipientKeyMissing(address.clone()))?;
        let public_key = EncryptionPublicKey::from_hex(&record.public_key)
            .map_err(|e| SessionError::InvalidPublicKey(address.clone(), e))?;

        self.public_keys.cache(address.as_str(), public_key);
        Ok(public_key)
    }

    /// Encrypt `data` under a fresh file key, store the ciphertext and record
    /// the file on the ledger with the owner's sealed copy of the key
    pub async fn upload_file(
        &self,
        file_name: &str,
        data: &[u8],
        module: ModuleKind,
    ) -> Result<UploadReceipt, SessionError> {
        let keys = self.require_keys()?;
        let file_key = FileKey::generate()?;

        let ciphertext = encrypt_file(data, &file_key)?;
        let cid = self.blobs.put(Bytes::from(ciphertext)).await?;

        let encrypted_file_key = encrypt_file_key(
            &file_key,
            &keys.encryption_public_key(),
            keys.encryption_secret_key(),
        )?;
        let file_id = self
            .ledger
            .upload_file(
                self.address(),
                cid,
                file_name.to_string(),
                encrypted_file_key,
                keys.version(),
                module,
            )
            .await?;

        tracing::info!(file_id, %cid, %module, "uploaded file");
        Ok(UploadReceipt {
            file_id,
            cid,
            document_hash: DocumentHash::compute(data),
            encrypted_file_key,
        })
    }

    async fn own_file_key(&self, file_id: FileId) -> Result<FileKey, SessionError> {
        let keys = self.require_keys()?;
        let sealed = self
            .ledger
            .get_encrypted_file_key(file_id, self.address())
            .await?;
        Ok(sealed.recover(keys.encryption_secret_key())?)
    }

    /// Fetch and decrypt a file this account owns or has a live grant for
    pub async fn download_file(&self, file_id: FileId) -> Result<Vec<u8>, SessionError> {
        let file_key = self.own_file_key(file_id).await?;
        let info = self.ledger.get_file_info(file_id).await?;
        let blob = self
            .blobs
            .get(&info.cid)
            .await?
            .ok_or(SessionError::BlobNotFound(info.cid))?;
        Ok(decrypt_file(&blob, &file_key)?)
    }

    /// Grant `recipient` access by sealing the file key to their public key
    pub async fn share_file(
        &self,
        file_id: FileId,
        recipient: &Address,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<(), SessionError> {
        let keys = self.require_keys()?;
        if !self.ledger.has_encryption_key(recipient).await? {
            return Err(SessionError::RecipientKeyMissing(recipient.clone()));
        }
        let recipient_public = self.public_key_of(recipient).await?;

        let file_key = self.own_file_key(file_id).await?;
        let sealed = encrypt_file_key(
            &file_key,
            &recipient_public,
            keys.encryption_secret_key(),
        )?;

        self.ledger
            .share_file(self.address(), file_id, recipient, sealed, expiry)
            .await?;
        tracing::info!(file_id, recipient = %recipient.short(), "shared file");
        Ok(())
    }

    pub async fn revoke_access(
        &self,
        file_id: FileId,
        recipient: &Address,
    ) -> Result<(), SessionError> {
        self.ledger
            .revoke_access(self.address(), file_id, recipient)
            .await?;
        tracing::info!(file_id, recipient = %recipient.short(), "revoked access");
        Ok(())
    }

    /// Files this account owns
    pub async fn my_files(&self) -> Result<Vec<FileInfo>, SessionError> {
        let mut files = Vec::new();
        for file_id in self.ledger.user_files(self.address()).await? {
            files.push(self.ledger.get_file_info(file_id).await?);
        }
        Ok(files)
    }

    /// Files shared with this account whose grant is still live
    pub async fn shared_with_me(&self) -> Result<Vec<(FileInfo, AccessInfo)>, SessionError> {
        let address = self.address();
        let mut files = Vec::new();
        for file_id in self.ledger.shared_files(address).await? {
            let access = self.ledger.get_access_info(file_id, address).await?;
            if !access.has_access {
                tracing::debug!(file_id, "skipping file with expired or revoked access");
                continue;
            }
            files.push((self.ledger.get_file_info(file_id).await?, access));
        }
        Ok(files)
    }

    /// Seal the hash of `data` on the ledger as proof of existence
    pub async fn timestamp_document(
        &self,
        file_id: FileId,
        data: &[u8],
        ip_type: &str,
        description: &str,
    ) -> Result<DocumentHash, SessionError> {
        let document_hash = DocumentHash::compute(data);
        self.ledger
            .timestamp_ip(
                self.address(),
                file_id,
                document_hash,
                ip_type.to_string(),
                description.to_string(),
            )
            .await?;
        Ok(document_hash)
    }

    /// Whether `data` hashes to the document hash sealed for `file_id`
    pub async fn verify_document(&self, file_id: FileId, data: &[u8]) -> Result<bool, SessionError> {
        Ok(self
            .ledger
            .verify_document_integrity(file_id, &DocumentHash::compute(data))
            .await?)
    }

    /// Tear the session down, dropping keys and clearing caches
    pub fn disconnect(self) {
        self.signatures
            .clear(self.address().as_str(), self.config.key_version);
        self.public_keys.clear();
        tracing::info!(address = %self.address(), "wallet disconnected");
    }
}
