/**
 * Encoded content addressing and storage
 *  for encrypted file blobs.
 */
pub mod blobs;
/**
 * Best-effort client-side caches for wallet
 *  signatures and other users' public keys.
 */
pub mod cache;
/**
 * Cryptographic types and operations.
 *  - Wallet-signature key derivation
 *  - Per-file symmetric encryption
 *  - Key-to-key file key sharing
 *  - Document hashing
 */
pub mod crypto;
/**
 * The ledger files, grants, registered keys
 *  and IP timestamps are recorded on.
 */
pub mod ledger;
/**
 * Connection manager tying a wallet, ledger
 *  and blob store to one set of derived keys.
 */
pub mod session;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;
/**
 * Signing accounts that key derivation
 *  starts from.
 */
pub mod wallet;

pub mod prelude {
    pub use crate::blobs::{content_address, BlobStore, FsBlobStore, MemoryBlobStore};
    pub use crate::build_info;
    pub use crate::cache::{FileStore, KeyValueStore, MemoryStore, SignatureCache};
    pub use crate::crypto::{
        derive_key_pair, DocumentHash, EncryptedFileKey, EncryptionPublicKey,
        EncryptionSecretKey, FileKey, KeyPairBundle, KeyVersion, WalletSignature,
    };
    pub use crate::ledger::{Address, FileId, Ledger, MemoryLedger, ModuleKind};
    pub use crate::session::{
        unlock_keys, KeySource, Session, SessionConfig, SessionError, UploadReceipt,
    };
    pub use crate::version::BuildInfo;
    pub use crate::wallet::{LocalWallet, Wallet};
}
