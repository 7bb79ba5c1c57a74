//! File-key transport using an ephemeral X25519 box
//!
//! To hand a [`FileKey`] to a holder (the owner itself on upload, then each
//! recipient on share):
//! 1. **Generate ephemeral keypair**: a fresh X25519 keypair per call
//! 2. **Box**: X25519 agreement between the ephemeral secret and the holder's
//!    public key, then XSalsa20-Poly1305 over the 32-byte file key
//! 3. **Package**: `ephemeral_public || nonce || box`
//!
//! The holder recovers the key by running the same agreement with their
//! secret key and the embedded ephemeral public key.
//!
//! The sender's long-term key takes no part in the box, so an
//! `EncryptedFileKey` does not authenticate who produced it. That matches
//! blobs already stored on the ledger.

use std::fmt;

use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::Aead;
use crypto_box::SalsaBox;
use serde::{Deserialize, Serialize};

use super::encoding;
use super::keys::{EncryptionPublicKey, EncryptionSecretKey, PUBLIC_KEY_SIZE};
use super::secret::{DecryptionError, FileKey, NONCE_SIZE, SECRET_SIZE, TAG_SIZE};

/// Total size of an `EncryptedFileKey` in bytes
///
/// Layout: ephemeral_pubkey (32) || nonce (24) || file_key (32) + tag (16) = 104 bytes
pub const ENCRYPTED_FILE_KEY_SIZE: usize = PUBLIC_KEY_SIZE + NONCE_SIZE + SECRET_SIZE + TAG_SIZE;

/// Errors that can occur while sealing a file key
#[derive(Debug, thiserror::Error)]
pub enum SecretShareError {
    #[error("share error: {0}")]
    Default(#[from] anyhow::Error),
}

/// A file key sealed for exactly one holder
///
/// # Wire Format
///
/// ```text
/// [ ephemeral_pubkey: 32 bytes ][ nonce: 24 bytes ][ box(file_key): 48 bytes ]
/// ```
///
/// Serialized as `0x`-prefixed hex, the form the ledger stores in `bytes` fields.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EncryptedFileKey([u8; ENCRYPTED_FILE_KEY_SIZE]);

impl From<[u8; ENCRYPTED_FILE_KEY_SIZE]> for EncryptedFileKey {
    fn from(bytes: [u8; ENCRYPTED_FILE_KEY_SIZE]) -> Self {
        EncryptedFileKey(bytes)
    }
}

impl TryFrom<&[u8]> for EncryptedFileKey {
    type Error = DecryptionError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != ENCRYPTED_FILE_KEY_SIZE {
            return Err(DecryptionError::InvalidLength {
                expected: ENCRYPTED_FILE_KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut buff = [0u8; ENCRYPTED_FILE_KEY_SIZE];
        buff.copy_from_slice(bytes);
        Ok(EncryptedFileKey(buff))
    }
}

impl fmt::Debug for EncryptedFileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedFileKey({})", self.to_hex())
    }
}

impl From<EncryptedFileKey> for String {
    fn from(key: EncryptedFileKey) -> Self {
        key.to_hex()
    }
}

impl TryFrom<String> for EncryptedFileKey {
    type Error = DecryptionError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl EncryptedFileKey {
    /// Parse from hexadecimal, with or without a `0x` prefix
    pub fn from_hex(hex: &str) -> Result<Self, DecryptionError> {
        let bytes =
            encoding::from_hex(hex).map_err(|e| DecryptionError::InvalidHex(e.to_string()))?;
        Self::try_from(bytes.as_slice())
    }

    /// `0x`-prefixed lowercase hex
    pub fn to_hex(&self) -> String {
        encoding::to_prefixed_hex(self.0)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// The ephemeral public key the box was sealed with
    pub fn ephemeral_public_key(&self) -> EncryptionPublicKey {
        let mut buff = [0u8; PUBLIC_KEY_SIZE];
        buff.copy_from_slice(&self.0[..PUBLIC_KEY_SIZE]);
        EncryptionPublicKey::from(buff)
    }

    /// Seal `file_key` so only the holder of `recipient`'s secret key can open it
    ///
    /// # Errors
    ///
    /// Returns an error only if the system RNG fails.
    pub fn new(
        file_key: &FileKey,
        recipient: &EncryptionPublicKey,
    ) -> Result<Self, SecretShareError> {
        let ephemeral = EncryptionSecretKey::generate()
            .map_err(|e| anyhow::anyhow!("failed to generate ephemeral key: {}", e))?;
        let ephemeral_public = ephemeral.public();

        let mut nonce = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce)
            .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;

        let salsa_box = SalsaBox::new(&recipient.to_box_public(), &ephemeral.to_box_secret());
        let sealed = salsa_box
            .encrypt(GenericArray::from_slice(&nonce), file_key.bytes())
            .map_err(|_| anyhow::anyhow!("box encrypt error"))?;

        // sanity check we're getting `ENCRYPTED_FILE_KEY_SIZE` bytes here
        if PUBLIC_KEY_SIZE + NONCE_SIZE + sealed.len() != ENCRYPTED_FILE_KEY_SIZE {
            return Err(anyhow::anyhow!("expected encrypted file key size is incorrect").into());
        }

        let mut out = [0u8; ENCRYPTED_FILE_KEY_SIZE];
        out[..PUBLIC_KEY_SIZE].copy_from_slice(ephemeral_public.as_bytes());
        out[PUBLIC_KEY_SIZE..PUBLIC_KEY_SIZE + NONCE_SIZE].copy_from_slice(&nonce);
        out[PUBLIC_KEY_SIZE + NONCE_SIZE..].copy_from_slice(&sealed);
        Ok(EncryptedFileKey(out))
    }

    /// Open the box with the holder's secret key
    ///
    /// # Errors
    ///
    /// Returns `DecryptionError::Authentication` if the key was sealed for a
    /// different holder or the bytes were altered.
    pub fn recover(&self, recipient_secret: &EncryptionSecretKey) -> Result<FileKey, DecryptionError> {
        let ephemeral = self.ephemeral_public_key();
        // X25519 ignores the top bit of a u-coordinate, so a flipped top bit
        // would otherwise open cleanly. Generated keys never set it.
        if ephemeral.as_bytes()[PUBLIC_KEY_SIZE - 1] & 0x80 != 0 {
            return Err(DecryptionError::Authentication);
        }

        let nonce = &self.0[PUBLIC_KEY_SIZE..PUBLIC_KEY_SIZE + NONCE_SIZE];
        let sealed = &self.0[PUBLIC_KEY_SIZE + NONCE_SIZE..];

        let salsa_box = SalsaBox::new(
            &ephemeral.to_box_public(),
            &recipient_secret.to_box_secret(),
        );
        let opened = salsa_box
            .decrypt(GenericArray::from_slice(nonce), sealed)
            .map_err(|_| DecryptionError::Authentication)?;

        FileKey::from_slice(&opened).map_err(|_| DecryptionError::Authentication)
    }
}

/// Seal a file key for `recipient_public`.
///
/// `_sender_secret` is accepted for call-site symmetry with the ledger flow
/// but is not used: every seal runs over a fresh ephemeral keypair.
pub fn encrypt_file_key(
    file_key: &FileKey,
    recipient_public: &EncryptionPublicKey,
    _sender_secret: &EncryptionSecretKey,
) -> Result<EncryptedFileKey, SecretShareError> {
    EncryptedFileKey::new(file_key, recipient_public)
}

/// Open a raw `ephemeral_public || nonce || box` blob
pub fn decrypt_file_key(
    blob: &[u8],
    recipient_secret: &EncryptionSecretKey,
) -> Result<FileKey, DecryptionError> {
    EncryptedFileKey::try_from(blob)?.recover(recipient_secret)
}
