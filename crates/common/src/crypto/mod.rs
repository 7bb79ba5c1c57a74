//! Cryptographic primitives for SecureDAG
//!
//! This module provides the client-side half of SecureDAG's security model:
//!
//! - **Identity**: a wallet signature over a fixed message is run through
//!   HKDF-SHA256 into a 32-byte seed, which expands into an Ed25519 signing
//!   keypair and an X25519 encryption keypair ([`derive_key_pair`])
//! - **Content Encryption**: every file gets its own random [`FileKey`] and is
//!   sealed with XSalsa20-Poly1305 (`nonce || ciphertext`)
//! - **Key Sharing**: a file key is sealed per holder with an ephemeral X25519
//!   box ([`EncryptedFileKey`]); the ledger stores one such blob per holder
//! - **Integrity**: SHA-256 [`DocumentHash`]es for tamper checks and IP timestamps
//!
//! # Upload / Share Flow
//!
//! 1. The wallet signs the message from [`build_message`]
//! 2. [`derive_key_pair`] turns the signature into a [`KeyPairBundle`]
//! 3. On upload, a fresh [`FileKey`] encrypts the file and is sealed to the
//!    owner's own encryption public key
//! 4. On share, the owner recovers the file key with their secret key and
//!    seals it again to the recipient's public key
//!
//! A file key never crosses a trust boundary unsealed.

pub mod encoding;
mod derivation;
mod hash;
mod kdf;
mod keys;
mod message;
mod secret;
mod secret_share;

pub use derivation::{
    derive_key_pair, derive_seed, expand_seed, verify_key_derivation, KeyDerivationError,
    KeyPairBundle, KeyVersion, Seed, WalletSignature, KEY_DERIVATION_LABEL, SEED_SIZE,
};
pub use ed25519_dalek::Signature;
pub use hash::{hash, verify, DocumentHash};
pub use kdf::{hkdf_sha256, sha256, KdfError, SHA256_SIZE};
pub use keys::{
    EncryptionPublicKey, EncryptionSecretKey, KeyError, SigningKeyPair, SigningPublicKey,
    PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE, SIGNING_SECRET_SIZE,
};
pub use message::{
    build_message, verify_message, DerivationMessage, DerivationMetadata, MessageMismatchError,
    MessageOptions, DEFAULT_DOMAIN, DEFAULT_ISSUED_AT, DEFAULT_NONCE,
};
pub use secret::{
    decrypt_file, encrypt_file, DecryptionError, FileKey, SecretError, NONCE_SIZE, SECRET_SIZE,
    TAG_SIZE,
};
pub use secret_share::{
    decrypt_file_key, encrypt_file_key, EncryptedFileKey, SecretShareError,
    ENCRYPTED_FILE_KEY_SIZE,
};
