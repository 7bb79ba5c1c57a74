use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cid::Cid;

use super::provider::{
    AccessInfo, EncryptionKeyRecord, FileId, FileInfo, IpTimestamp, Ledger, LedgerError,
    ModuleKind,
};
use super::Address;
use crate::crypto::{DocumentHash, EncryptedFileKey, KeyVersion};

/// In-memory ledger enforcing the same access rules as the on-chain registry
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<RwLock<MemoryLedgerInner>>,
}

#[derive(Debug, Default)]
struct MemoryLedgerInner {
    /// Registered encryption keys by account
    keys: HashMap<Address, EncryptionKeyRecord>,
    files: HashMap<FileId, FileInfo>,
    /// Grants: file_id -> holder -> grant
    grants: HashMap<FileId, HashMap<Address, Grant>>,
    /// Owner -> files in upload order
    owned: HashMap<Address, Vec<FileId>>,
    /// Holder -> files shared with them, in share order
    shared: HashMap<Address, Vec<FileId>>,
    timestamps: HashMap<FileId, IpTimestamp>,
    next_file_id: FileId,
}

#[derive(Debug, Clone)]
struct Grant {
    encrypted_file_key: EncryptedFileKey,
    expiry: Option<DateTime<Utc>>,
    active: bool,
}

impl Grant {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expiry.map_or(true, |expiry| expiry > now)
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryLedgerInner>, LedgerError> {
        self.inner
            .read()
            .map_err(|e| anyhow::anyhow!("failed to acquire read lock: {}", e).into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryLedgerInner>, LedgerError> {
        self.inner
            .write()
            .map_err(|e| anyhow::anyhow!("failed to acquire write lock: {}", e).into())
    }
}

impl MemoryLedgerInner {
    fn file(&self, file_id: FileId) -> Result<&FileInfo, LedgerError> {
        self.files
            .get(&file_id)
            .ok_or(LedgerError::FileNotFound(file_id))
    }

    fn require_owner(&self, caller: &Address, file_id: FileId) -> Result<(), LedgerError> {
        if &self.file(file_id)?.owner != caller {
            return Err(LedgerError::NotOwner(file_id));
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn set_encryption_key(
        &self,
        caller: &Address,
        public_key: String,
        version: KeyVersion,
    ) -> Result<(), LedgerError> {
        let mut inner = self.write()?;
        inner.keys.insert(
            caller.clone(),
            EncryptionKeyRecord {
                public_key,
                version,
                is_active: true,
                registered_at: Utc::now(),
            },
        );
        tracing::debug!(address = %caller, %version, "registered encryption key");
        Ok(())
    }

    async fn get_encryption_key(
        &self,
        address: &Address,
    ) -> Result<Option<EncryptionKeyRecord>, LedgerError> {
        Ok(self.read()?.keys.get(address).cloned())
    }

    async fn has_encryption_key(&self, address: &Address) -> Result<bool, LedgerError> {
        Ok(self
            .read()?
            .keys
            .get(address)
            .is_some_and(|record| record.is_active))
    }

    async fn upload_file(
        &self,
        caller: &Address,
        cid: Cid,
        file_name: String,
        encrypted_file_key: EncryptedFileKey,
        key_version: KeyVersion,
        module: ModuleKind,
    ) -> Result<FileId, LedgerError> {
        let mut inner = self.write()?;
        inner.next_file_id += 1;
        let id = inner.next_file_id;

        inner.files.insert(
            id,
            FileInfo {
                id,
                owner: caller.clone(),
                cid,
                file_name,
                created_at: Utc::now(),
                key_version,
                module,
            },
        );
        inner.grants.entry(id).or_default().insert(
            caller.clone(),
            Grant {
                encrypted_file_key,
                expiry: None,
                active: true,
            },
        );
        inner.owned.entry(caller.clone()).or_default().push(id);
        Ok(id)
    }

    async fn share_file(
        &self,
        caller: &Address,
        file_id: FileId,
        recipient: &Address,
        encrypted_file_key: EncryptedFileKey,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<(), LedgerError> {
        let mut inner = self.write()?;
        inner.require_owner(caller, file_id)?;
        if caller == recipient {
            return Err(LedgerError::SelfShare(file_id));
        }
        if !inner.keys.get(recipient).is_some_and(|k| k.is_active) {
            return Err(LedgerError::NoEncryptionKey(recipient.clone()));
        }

        inner.grants.entry(file_id).or_default().insert(
            recipient.clone(),
            Grant {
                encrypted_file_key,
                expiry,
                active: true,
            },
        );
        let shared = inner.shared.entry(recipient.clone()).or_default();
        if !shared.contains(&file_id) {
            shared.push(file_id);
        }
        Ok(())
    }

    async fn revoke_access(
        &self,
        caller: &Address,
        file_id: FileId,
        recipient: &Address,
    ) -> Result<(), LedgerError> {
        let mut inner = self.write()?;
        inner.require_owner(caller, file_id)?;
        if caller == recipient {
            return Err(LedgerError::SelfShare(file_id));
        }
        let grant = inner
            .grants
            .get_mut(&file_id)
            .and_then(|grants| grants.get_mut(recipient))
            .ok_or(LedgerError::AccessDenied(file_id))?;
        grant.active = false;
        Ok(())
    }

    async fn get_encrypted_file_key(
        &self,
        file_id: FileId,
        holder: &Address,
    ) -> Result<EncryptedFileKey, LedgerError> {
        let inner = self.read()?;
        inner.file(file_id)?;
        inner
            .grants
            .get(&file_id)
            .and_then(|grants| grants.get(holder))
            .filter(|grant| grant.is_live(Utc::now()))
            .map(|grant| grant.encrypted_file_key)
            .ok_or(LedgerError::AccessDenied(file_id))
    }

    async fn get_access_info(
        &self,
        file_id: FileId,
        holder: &Address,
    ) -> Result<AccessInfo, LedgerError> {
        let inner = self.read()?;
        inner.file(file_id)?;
        Ok(inner
            .grants
            .get(&file_id)
            .and_then(|grants| grants.get(holder))
            .map(|grant| AccessInfo {
                has_access: grant.is_live(Utc::now()),
                expiry: grant.expiry,
            })
            .unwrap_or(AccessInfo {
                has_access: false,
                expiry: None,
            }))
    }

    async fn get_file_info(&self, file_id: FileId) -> Result<FileInfo, LedgerError> {
        Ok(self.read()?.file(file_id)?.clone())
    }

    async fn user_files(&self, owner: &Address) -> Result<Vec<FileId>, LedgerError> {
        Ok(self.read()?.owned.get(owner).cloned().unwrap_or_default())
    }

    async fn shared_files(&self, holder: &Address) -> Result<Vec<FileId>, LedgerError> {
        Ok(self.read()?.shared.get(holder).cloned().unwrap_or_default())
    }

    async fn timestamp_ip(
        &self,
        caller: &Address,
        file_id: FileId,
        document_hash: DocumentHash,
        ip_type: String,
        description: String,
    ) -> Result<(), LedgerError> {
        let mut inner = self.write()?;
        inner.require_owner(caller, file_id)?;
        if inner.timestamps.contains_key(&file_id) {
            return Err(LedgerError::AlreadyTimestamped(file_id));
        }
        inner.timestamps.insert(
            file_id,
            IpTimestamp {
                document_hash,
                timestamp: Utc::now(),
                ip_type,
                description,
            },
        );
        Ok(())
    }

    async fn get_ip_timestamp(&self, file_id: FileId) -> Result<IpTimestamp, LedgerError> {
        self.read()?
            .timestamps
            .get(&file_id)
            .cloned()
            .ok_or(LedgerError::TimestampNotFound(file_id))
    }

    async fn has_ip_timestamp(&self, file_id: FileId) -> Result<bool, LedgerError> {
        Ok(self.read()?.timestamps.contains_key(&file_id))
    }

    async fn verify_document_integrity(
        &self,
        file_id: FileId,
        document_hash: &DocumentHash,
    ) -> Result<bool, LedgerError> {
        let timestamp = self.get_ip_timestamp(file_id).await?;
        Ok(&timestamp.document_hash == document_hash)
    }
}
