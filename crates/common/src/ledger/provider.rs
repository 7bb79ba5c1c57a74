use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cid::Cid;

use super::Address;
use crate::crypto::{DocumentHash, EncryptedFileKey, KeyVersion};

/// Ledger-assigned file identifier
pub type FileId = u64;

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("file {0} not found")]
    FileNotFound(FileId),
    /// No live grant: never shared, revoked, or expired
    #[error("access denied to file {0}")]
    AccessDenied(FileId),
    #[error("only the owner of file {0} may do this")]
    NotOwner(FileId),
    #[error("{0} has no encryption key registered")]
    NoEncryptionKey(Address),
    #[error("cannot share file {0} with its owner")]
    SelfShare(FileId),
    #[error("file {0} already has an IP timestamp")]
    AlreadyTimestamped(FileId),
    #[error("file {0} has no IP timestamp")]
    TimestampNotFound(FileId),
    #[error("unhandled ledger error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Application module a file was uploaded under
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    MediVault = 0,
    BioKey = 1,
    IpSeal = 2,
}

impl ModuleKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ModuleKind::MediVault => "MediVault",
            ModuleKind::BioKey => "BioKey",
            ModuleKind::IpSeal => "IPSeal",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown module {0}")]
pub struct UnknownModule(pub u8);

impl TryFrom<u8> for ModuleKind {
    type Error = UnknownModule;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ModuleKind::MediVault),
            1 => Ok(ModuleKind::BioKey),
            2 => Ok(ModuleKind::IpSeal),
            other => Err(UnknownModule(other)),
        }
    }
}

impl From<ModuleKind> for u8 {
    fn from(module: ModuleKind) -> Self {
        module as u8
    }
}

/// Public record of an uploaded file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    pub id: FileId,
    pub owner: Address,
    pub cid: Cid,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub key_version: KeyVersion,
    pub module: ModuleKind,
}

/// A registered encryption public key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptionKeyRecord {
    /// `0x`-prefixed hex of the X25519 public key
    pub public_key: String,
    pub version: KeyVersion,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
}

/// Grant state for one holder of one file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessInfo {
    pub has_access: bool,
    pub expiry: Option<DateTime<Utc>>,
}

/// Proof-of-existence record sealed by a file's owner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IpTimestamp {
    pub document_hash: DocumentHash,
    pub timestamp: DateTime<Utc>,
    pub ip_type: String,
    pub description: String,
}

/// The on-chain registry the client talks to
///
/// Mutating calls take the caller explicitly in place of a transaction sender.
#[async_trait]
pub trait Ledger: Send + Sync + fmt::Debug {
    /// Register (or replace) the caller's encryption public key
    async fn set_encryption_key(
        &self,
        caller: &Address,
        public_key: String,
        version: KeyVersion,
    ) -> Result<(), LedgerError>;

    async fn get_encryption_key(
        &self,
        address: &Address,
    ) -> Result<Option<EncryptionKeyRecord>, LedgerError>;

    async fn has_encryption_key(&self, address: &Address) -> Result<bool, LedgerError>;

    /// Record a new file owned by the caller. The caller is granted access
    /// through `encrypted_file_key`, with no expiry.
    async fn upload_file(
        &self,
        caller: &Address,
        cid: Cid,
        file_name: String,
        encrypted_file_key: EncryptedFileKey,
        key_version: KeyVersion,
        module: ModuleKind,
    ) -> Result<FileId, LedgerError>;

    /// Grant `recipient` access until `expiry` (or indefinitely). Owner only.
    async fn share_file(
        &self,
        caller: &Address,
        file_id: FileId,
        recipient: &Address,
        encrypted_file_key: EncryptedFileKey,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<(), LedgerError>;

    /// Owner only
    async fn revoke_access(
        &self,
        caller: &Address,
        file_id: FileId,
        recipient: &Address,
    ) -> Result<(), LedgerError>;

    /// The holder's sealed copy of the file key, if their grant is live
    async fn get_encrypted_file_key(
        &self,
        file_id: FileId,
        holder: &Address,
    ) -> Result<EncryptedFileKey, LedgerError>;

    async fn get_access_info(
        &self,
        file_id: FileId,
        holder: &Address,
    ) -> Result<AccessInfo, LedgerError>;

    async fn get_file_info(&self, file_id: FileId) -> Result<FileInfo, LedgerError>;

    async fn user_files(&self, owner: &Address) -> Result<Vec<FileId>, LedgerError>;

    /// Files ever shared with `holder`, whether or not the grant is still live
    async fn shared_files(&self, holder: &Address) -> Result<Vec<FileId>, LedgerError>;

    /// Seal a document hash for a file. Owner only, once per file.
    async fn timestamp_ip(
        &self,
        caller: &Address,
        file_id: FileId,
        document_hash: DocumentHash,
        ip_type: String,
        description: String,
    ) -> Result<(), LedgerError>;

    async fn get_ip_timestamp(&self, file_id: FileId) -> Result<IpTimestamp, LedgerError>;

    async fn has_ip_timestamp(&self, file_id: FileId) -> Result<bool, LedgerError>;

    /// Whether `document_hash` equals the sealed hash for the file
    async fn verify_document_integrity(
        &self,
        file_id: FileId,
        document_hash: &DocumentHash,
    ) -> Result<bool, LedgerError>;
}
