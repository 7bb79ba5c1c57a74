//! Deterministic key derivation from wallet signatures
//!
//! A user's whole cryptographic identity is regenerated from one wallet
//! signature:
//!
//! ```text
//! signature --HKDF-SHA256(salt = "", info = label + " v<version>")--> seed (32 bytes)
//! seed --Ed25519 seeded keygen--> signing keypair
//! seed --used as the raw X25519 scalar--> encryption keypair
//! ```
//!
//! Both expansions consume the *same* seed bytes. Previously registered public
//! keys depend on this exact layout, so it must not change.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::encoding;
use super::kdf::{hkdf_sha256, KdfError};
use super::keys::{EncryptionPublicKey, EncryptionSecretKey, SigningKeyPair};

/// HKDF info label; the version suffix is appended after a space
pub const KEY_DERIVATION_LABEL: &str = "Derive SecureDAG encryption key v1";
/// Size of the derived seed in bytes
pub const SEED_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum KeyDerivationError {
    #[error("signature is empty")]
    EmptySignature,
    #[error("signature is not valid hex: {0}")]
    InvalidSignature(#[from] encoding::EncodingError),
    #[error("unsupported key version {0}, expected {min}..={max}", min = KeyVersion::MIN, max = KeyVersion::MAX)]
    UnsupportedVersion(u32),
    #[error("hkdf error: {0}")]
    Kdf(#[from] KdfError),
}

/// Version tag mixed into the derivation, giving each version an unrelated keypair
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct KeyVersion(u32);

impl KeyVersion {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 10;
    pub const CURRENT: KeyVersion = KeyVersion(1);

    pub fn new(version: u32) -> Result<Self, KeyDerivationError> {
        if Self::is_supported(version) {
            Ok(Self(version))
        } else {
            Err(KeyDerivationError::UnsupportedVersion(version))
        }
    }

    pub fn is_supported(version: u32) -> bool {
        (Self::MIN..=Self::MAX).contains(&version)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// HKDF info string for this version
    pub fn info(&self) -> String {
        format!("{} v{}", KEY_DERIVATION_LABEL, self.0)
    }
}

impl Default for KeyVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for KeyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for KeyVersion {
    type Error = KeyDerivationError;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<KeyVersion> for u32 {
    fn from(version: KeyVersion) -> Self {
        version.0
    }
}

/// Raw bytes a wallet produced by signing the derivation message
///
/// Not a secret key by itself, but anyone holding it can re-derive the
/// user's keys, so it is treated as sensitive. Serialized as `0x`-prefixed hex.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct WalletSignature(Vec<u8>);

impl WalletSignature {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, KeyDerivationError> {
        if bytes.is_empty() {
            return Err(KeyDerivationError::EmptySignature);
        }
        Ok(Self(bytes))
    }

    /// Parse a signature from hex, with or without a `0x` prefix
    pub fn from_hex(hex: &str) -> Result<Self, KeyDerivationError> {
        Self::from_bytes(encoding::from_hex(hex)?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        encoding::to_prefixed_hex(&self.0)
    }
}

impl fmt::Debug for WalletSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletSignature({} bytes)", self.0.len())
    }
}

impl From<WalletSignature> for String {
    fn from(signature: WalletSignature) -> Self {
        signature.to_hex()
    }
}

impl TryFrom<String> for WalletSignature {
    type Error = KeyDerivationError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

/// 32-byte HKDF output both keypairs are expanded from. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed([u8; SEED_SIZE]);

impl Seed {
    pub fn as_bytes(&self) -> &[u8; SEED_SIZE] {
        &self.0
    }
}

impl From<[u8; SEED_SIZE]> for Seed {
    fn from(bytes: [u8; SEED_SIZE]) -> Self {
        Self(bytes)
    }
}

impl Drop for Seed {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// Everything derived from one signature at one version
///
/// Owned by the user's session; the private halves never leave the process.
#[derive(Clone, Debug)]
pub struct KeyPairBundle {
    signing: SigningKeyPair,
    encryption: EncryptionSecretKey,
    seed: Seed,
    version: KeyVersion,
}

impl KeyPairBundle {
    pub fn signing_key_pair(&self) -> &SigningKeyPair {
        &self.signing
    }

    pub fn encryption_secret_key(&self) -> &EncryptionSecretKey {
        &self.encryption
    }

    pub fn encryption_public_key(&self) -> EncryptionPublicKey {
        self.encryption.public()
    }

    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    pub fn version(&self) -> KeyVersion {
        self.version
    }
}

/// Run HKDF-SHA256 over the signature with the version's info string
pub fn derive_seed(
    signature: &WalletSignature,
    version: KeyVersion,
) -> Result<Seed, KeyDerivationError> {
    let mut okm = [0u8; SEED_SIZE];
    hkdf_sha256(signature.as_bytes(), None, version.info().as_bytes(), &mut okm)?;
    let seed = Seed(okm);
    okm.zeroize();
    Ok(seed)
}

/// Expand a seed into its signing and encryption keypairs
pub fn expand_seed(seed: &Seed) -> (SigningKeyPair, EncryptionSecretKey) {
    let signing = SigningKeyPair::from_seed(seed.as_bytes());
    let encryption = EncryptionSecretKey::from(*seed.as_bytes());
    (signing, encryption)
}

/// Derive the full key bundle for a signature at a given version
pub fn derive_key_pair(
    signature: &WalletSignature,
    version: KeyVersion,
) -> Result<KeyPairBundle, KeyDerivationError> {
    let seed = derive_seed(signature, version)?;
    let (signing, encryption) = expand_seed(&seed);
    tracing::debug!(
        version = %version,
        public_key = %encryption.public(),
        "derived key pair from wallet signature"
    );
    Ok(KeyPairBundle {
        signing,
        encryption,
        seed,
        version,
    })
}

/// Whether `signature` re-derives `expected` at `version`
pub fn verify_key_derivation(
    signature: &WalletSignature,
    expected: &EncryptionPublicKey,
    version: KeyVersion,
) -> bool {
    match derive_seed(signature, version) {
        Ok(seed) => {
            let (_, encryption) = expand_seed(&seed);
            encryption.public() == *expected
        }
        Err(e) => {
            tracing::debug!("key derivation verification failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::keys::{PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE, SIGNING_SECRET_SIZE};

    fn fixed_signature() -> WalletSignature {
        WalletSignature::from_hex(&format!("0x{}", "deadbeef".repeat(16))).unwrap()
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let signature = fixed_signature();
        let a = derive_key_pair(&signature, KeyVersion::CURRENT).unwrap();
        let b = derive_key_pair(&signature, KeyVersion::CURRENT).unwrap();

        assert_eq!(a.seed(), b.seed());
        assert_eq!(a.encryption_public_key(), b.encryption_public_key());
        assert_eq!(
            a.encryption_secret_key().to_bytes(),
            b.encryption_secret_key().to_bytes()
        );
        assert_eq!(
            a.signing_key_pair().secret_key_bytes(),
            b.signing_key_pair().secret_key_bytes()
        );
    }

    #[test]
    fn test_seed_matches_hkdf_with_versioned_info() {
        let signature = fixed_signature();
        let seed = derive_seed(&signature, KeyVersion::CURRENT).unwrap();

        let mut expected = [0u8; SEED_SIZE];
        hkdf_sha256(
            signature.as_bytes(),
            Some(&[]),
            b"Derive SecureDAG encryption key v1 v1",
            &mut expected,
        )
        .unwrap();
        assert_eq!(seed.as_bytes(), &expected);
    }

    #[test]
    fn test_versions_are_domain_separated() {
        let signature = fixed_signature();
        let v1 = derive_seed(&signature, KeyVersion::new(1).unwrap()).unwrap();
        let v2 = derive_seed(&signature, KeyVersion::new(2).unwrap()).unwrap();
        assert_ne!(v1, v2);
    }

    #[test]
    fn test_seed_doubles_as_encryption_scalar() {
        let signature = fixed_signature();
        let bundle = derive_key_pair(&signature, KeyVersion::CURRENT).unwrap();

        assert_eq!(
            &bundle.encryption_secret_key().to_bytes(),
            bundle.seed().as_bytes()
        );
        let expected_public = x25519_dalek::PublicKey::from(&x25519_dalek::StaticSecret::from(
            *bundle.seed().as_bytes(),
        ));
        assert_eq!(
            bundle.encryption_public_key().to_bytes(),
            expected_public.to_bytes()
        );
        assert_eq!(
            &bundle.signing_key_pair().secret_key_bytes()[..PRIVATE_KEY_SIZE],
            bundle.seed().as_bytes()
        );
    }

    #[test]
    fn test_bundle_key_sizes() {
        let bundle = derive_key_pair(&fixed_signature(), KeyVersion::CURRENT).unwrap();
        assert_eq!(
            bundle.signing_key_pair().public().to_bytes().len(),
            PUBLIC_KEY_SIZE
        );
        assert_eq!(
            bundle.signing_key_pair().secret_key_bytes().len(),
            SIGNING_SECRET_SIZE
        );
        assert_eq!(bundle.encryption_public_key().to_bytes().len(), PUBLIC_KEY_SIZE);
        assert_eq!(
            bundle.encryption_secret_key().to_bytes().len(),
            PRIVATE_KEY_SIZE
        );
    }

    #[test]
    fn test_unsupported_versions() {
        assert!(matches!(
            KeyVersion::new(0),
            Err(KeyDerivationError::UnsupportedVersion(0))
        ));
        assert!(KeyVersion::new(11).is_err());
        assert!(KeyVersion::new(1).is_ok());
        assert!(KeyVersion::new(10).is_ok());
        assert!(serde_json::from_str::<KeyVersion>("42").is_err());
        assert_eq!(serde_json::from_str::<KeyVersion>("3").unwrap().get(), 3);
    }

    #[test]
    fn test_malformed_signatures() {
        assert!(matches!(
            WalletSignature::from_hex("0x"),
            Err(KeyDerivationError::EmptySignature)
        ));
        assert!(matches!(
            WalletSignature::from_hex("0xnothex"),
            Err(KeyDerivationError::InvalidSignature(_))
        ));
        assert!(WalletSignature::from_bytes(Vec::new()).is_err());
    }

    #[test]
    fn test_verify_key_derivation() {
        let signature = fixed_signature();
        let bundle = derive_key_pair(&signature, KeyVersion::CURRENT).unwrap();
        let expected = bundle.encryption_public_key();

        assert!(verify_key_derivation(&signature, &expected, KeyVersion::CURRENT));
        assert!(!verify_key_derivation(
            &signature,
            &expected,
            KeyVersion::new(2).unwrap()
        ));

        let other = WalletSignature::from_hex("0x01").unwrap();
        assert!(!verify_key_derivation(&other, &expected, KeyVersion::CURRENT));
    }

    #[test]
    fn test_signing_key_signs() {
        let bundle = derive_key_pair(&fixed_signature(), KeyVersion::CURRENT).unwrap();
        let signature = bundle.signing_key_pair().sign(b"identity");
        assert!(bundle
            .signing_key_pair()
            .public()
            .verify(b"identity", &signature)
            .is_ok());
    }
}
