use std::fmt;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use super::encoding;

/// Size of an X25519 private key in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of an X25519 or Ed25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Size of an Ed25519 secret key in its expanded `seed || public` form
pub const SIGNING_SECRET_SIZE: usize = 64;

/// Errors that can occur during key operations
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
}

/// X25519 public key used to receive file keys
///
/// This is the key a user publishes to the key registry. Anyone holding it can
/// produce an [`EncryptedFileKey`](super::EncryptedFileKey) only the owner of the
/// matching [`EncryptionSecretKey`] can open.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EncryptionPublicKey([u8; PUBLIC_KEY_SIZE]);

impl From<[u8; PUBLIC_KEY_SIZE]> for EncryptionPublicKey {
    fn from(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for EncryptionPublicKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid public key size, expected {}, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            )
            .into());
        }
        let mut buff = [0; PUBLIC_KEY_SIZE];
        buff.copy_from_slice(bytes);
        Ok(buff.into())
    }
}

impl EncryptionPublicKey {
    /// Parse a public key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let buff = encoding::from_hex_array::<PUBLIC_KEY_SIZE>(hex)
            .map_err(|e| anyhow::anyhow!("public key hex decode error: {}", e))?;
        Ok(buff.into())
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        encoding::to_hex(self.0)
    }

    pub(crate) fn to_box_public(self) -> crypto_box::PublicKey {
        crypto_box::PublicKey::from(self.0)
    }
}

impl fmt::Debug for EncryptionPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionPublicKey({})", self.to_hex())
    }
}

impl fmt::Display for EncryptionPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<EncryptionPublicKey> for String {
    fn from(key: EncryptionPublicKey) -> Self {
        key.to_hex()
    }
}

impl TryFrom<String> for EncryptionPublicKey {
    type Error = KeyError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

/// X25519 private key used to open file keys shared with us
///
/// The raw bytes are used as the scalar directly (clamped by X25519 itself),
/// which is what lets a derivation seed double as an encryption key.
/// The secret is zeroized on drop and never printed.
#[derive(Clone)]
pub struct EncryptionSecretKey(StaticSecret);

impl From<[u8; PRIVATE_KEY_SIZE]> for EncryptionSecretKey {
    fn from(bytes: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(StaticSecret::from(bytes))
    }
}

impl EncryptionSecretKey {
    /// Generate a new random secret key using a cryptographically secure RNG
    pub fn generate() -> Result<Self, KeyError> {
        let mut bytes = [0u8; PRIVATE_KEY_SIZE];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        Ok(Self::from(bytes))
    }

    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let buff = encoding::from_hex_array::<PRIVATE_KEY_SIZE>(hex)
            .map_err(|_| anyhow::anyhow!("private key hex decode error"))?;
        Ok(Self::from(buff))
    }

    pub fn public(&self) -> EncryptionPublicKey {
        EncryptionPublicKey(X25519PublicKey::from(&self.0).to_bytes())
    }

    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.0.to_bytes()
    }

    pub(crate) fn to_box_secret(&self) -> crypto_box::SecretKey {
        crypto_box::SecretKey::from(self.0.to_bytes())
    }
}

impl fmt::Debug for EncryptionSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionSecretKey(public: {})", self.public().to_hex())
    }
}

/// Ed25519 public key used to verify identity signatures
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPublicKey(VerifyingKey);

impl SigningPublicKey {
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let buff = encoding::from_hex_array::<PUBLIC_KEY_SIZE>(hex)
            .map_err(|_| anyhow::anyhow!("public key hex decode error"))?;
        let key = VerifyingKey::from_bytes(&buff)
            .map_err(|_| anyhow::anyhow!("public key is not a valid edwards point"))?;
        Ok(Self(key))
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        encoding::to_hex(self.to_bytes())
    }

    /// Verify an Ed25519 signature on a message.
    pub fn verify(
        &self,
        msg: &[u8],
        signature: &ed25519_dalek::Signature,
    ) -> Result<(), ed25519_dalek::SignatureError> {
        self.0.verify_strict(msg, signature)
    }
}

impl fmt::Debug for SigningPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningPublicKey({})", self.to_hex())
    }
}

/// Ed25519 keypair used for identity signatures
///
/// Built from a 32-byte seed following the NaCl `sign.keyPair.fromSeed`
/// convention: the 64-byte secret key is `seed || public_key`.
#[derive(Clone)]
pub struct SigningKeyPair(SigningKey);

impl SigningKeyPair {
    pub fn from_seed(seed: &[u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(SigningKey::from_bytes(seed))
    }

    /// Generate a new random keypair using a cryptographically secure RNG
    pub fn generate() -> Result<Self, KeyError> {
        let mut seed = [0u8; PRIVATE_KEY_SIZE];
        getrandom::getrandom(&mut seed)
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        Ok(Self::from_seed(&seed))
    }

    pub fn public(&self) -> SigningPublicKey {
        SigningPublicKey(self.0.verifying_key())
    }

    /// The expanded `seed || public_key` secret key
    pub fn secret_key_bytes(&self) -> [u8; SIGNING_SECRET_SIZE] {
        self.0.to_keypair_bytes()
    }

    /// Sign a message with this keypair using Ed25519.
    pub fn sign(&self, msg: &[u8]) -> ed25519_dalek::Signature {
        self.0.sign(msg)
    }

    /// Encode the seed in PEM format for storage on disk
    ///
    /// Returns a PEM-encoded string with tag "PRIVATE KEY".
    pub fn to_pem(&self) -> String {
        let pem = pem::Pem::new("PRIVATE KEY", self.0.to_bytes());
        pem::encode(&pem)
    }

    /// Parse a keypair from PEM format
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The PEM string is malformed
    /// - The PEM tag is not "PRIVATE KEY"
    /// - The key size is incorrect
    pub fn from_pem(pem_str: &str) -> Result<Self, KeyError> {
        let pem = pem::parse(pem_str).map_err(|e| anyhow::anyhow!("failed to parse PEM: {}", e))?;

        if pem.tag() != "PRIVATE KEY" {
            return Err(anyhow::anyhow!("invalid PEM tag, expected PRIVATE KEY").into());
        }

        let contents = pem.contents();
        if contents.len() != PRIVATE_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid private key size in PEM, expected {}, got {}",
                PRIVATE_KEY_SIZE,
                contents.len()
            )
            .into());
        }

        let mut seed = [0u8; PRIVATE_KEY_SIZE];
        seed.copy_from_slice(contents);
        Ok(Self::from_seed(&seed))
    }
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKeyPair(public: {})", self.public().to_hex())
    }
}
