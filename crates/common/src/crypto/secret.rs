//! File content encryption using XSalsa20-Poly1305
//!
//! Every uploaded file gets its own random `FileKey`. The encrypted format is
//! the NaCl secretbox layout with the nonce prepended:
//!
//! ```text
//! [ nonce: 24 bytes ][ secretbox(plaintext): len + 16 bytes ]
//! ```

use std::fmt;

use crypto_secretbox::aead::generic_array::GenericArray;
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::XSalsa20Poly1305;
use zeroize::Zeroize;

use super::encoding;

/// Size of the XSalsa20 nonce in bytes
pub const NONCE_SIZE: usize = 24;
/// Size of a file key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;
/// Size of the Poly1305 authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Errors that can occur during encryption
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Authentication or format failure while opening a ciphertext
///
/// Always fatal to the calling operation: a wrong key and a tampered blob are
/// indistinguishable, and neither may yield plaintext.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("failed to decrypt: invalid key or corrupted data")]
    Authentication,
    #[error("ciphertext too short, expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("invalid ciphertext size, expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("invalid ciphertext hex: {0}")]
    InvalidHex(String),
}

/// A 256-bit symmetric key protecting one file's contents
///
/// Never stored or transmitted in the clear: it leaves the client only inside
/// an [`EncryptedFileKey`](super::EncryptedFileKey). Zeroized on drop.
///
/// # Examples
///
/// ```ignore
/// let key = FileKey::generate()?;
/// let blob = key.encrypt(b"sensitive data")?;
/// let recovered = key.decrypt(&blob)?;
/// assert_eq!(&recovered[..], b"sensitive data");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct FileKey([u8; SECRET_SIZE]);

impl From<[u8; SECRET_SIZE]> for FileKey {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        FileKey(bytes)
    }
}

impl Drop for FileKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileKey(..)")
    }
}

impl FileKey {
    /// Generate a new random key using a cryptographically secure RNG
    pub fn generate() -> Result<Self, SecretError> {
        let mut buff = [0; SECRET_SIZE];
        getrandom::getrandom(&mut buff)
            .map_err(|e| anyhow::anyhow!("failed to generate file key: {}", e))?;
        Ok(Self(buff))
    }

    /// Create a key from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        if data.len() != SECRET_SIZE {
            return Err(anyhow::anyhow!(
                "invalid file key size, expected {}, got {}",
                SECRET_SIZE,
                data.len()
            )
            .into());
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    pub fn from_hex(hex: &str) -> Result<Self, SecretError> {
        let buff = encoding::from_hex_array::<SECRET_SIZE>(hex)
            .map_err(|e| anyhow::anyhow!("file key hex decode error: {}", e))?;
        Ok(buff.into())
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn cipher(&self) -> XSalsa20Poly1305 {
        XSalsa20Poly1305::new(GenericArray::from_slice(&self.0))
    }

    /// Encrypt data, returning `nonce || ciphertext`
    ///
    /// A fresh random nonce is drawn for every call.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails (should be rare, only on system RNG failure).
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        let mut nonce = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce)
            .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;

        let ciphertext = self
            .cipher()
            .encrypt(GenericArray::from_slice(&nonce), data)
            .map_err(|_| anyhow::anyhow!("encrypt error"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a `nonce || ciphertext` blob produced by [`FileKey::encrypt`]
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Data is too short to contain a nonce and tag
    /// - Authentication tag verification fails (data was tampered with or wrong key)
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(DecryptionError::Truncated {
                expected: NONCE_SIZE + TAG_SIZE,
                actual: data.len(),
            });
        }

        let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
        self.cipher()
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| DecryptionError::Authentication)
    }
}

/// Encrypt file bytes under `key`, producing `nonce || ciphertext`
pub fn encrypt_file(data: &[u8], key: &FileKey) -> Result<Vec<u8>, SecretError> {
    key.encrypt(data)
}

/// Open a blob produced by [`encrypt_file`]
pub fn decrypt_file(blob: &[u8], key: &FileKey) -> Result<Vec<u8>, DecryptionError> {
    key.decrypt(blob)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_file_encrypt_decrypt() {
        let key = FileKey::generate().unwrap();
        let data = b"hello world, this is a test message for encryption";

        let encrypted = key.encrypt(data).unwrap();
        assert_eq!(encrypted.len(), NONCE_SIZE + data.len() + TAG_SIZE);

        let decrypted = key.decrypt(&encrypted).unwrap();
        assert_eq!(data.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_nonce_is_fresh_per_call() {
        let key = FileKey::generate().unwrap();
        let a = key.encrypt(b"same").unwrap();
        let b = key.encrypt(b"same").unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_data_encryption() {
        let key = FileKey::generate().unwrap();
        let encrypted = key.encrypt(b"").unwrap();
        assert_eq!(encrypted.len(), NONCE_SIZE + TAG_SIZE);
        assert_eq!(key.decrypt(&encrypted).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_wrong_key_fails() {
        let key = FileKey::generate().unwrap();
        let other = FileKey::generate().unwrap();
        let encrypted = key.encrypt(b"secret").unwrap();
        assert_eq!(
            other.decrypt(&encrypted),
            Err(DecryptionError::Authentication)
        );
    }

    #[test]
    fn test_any_bit_flip_is_detected() {
        let key = FileKey::from([9u8; SECRET_SIZE]);
        let encrypted = key.encrypt(b"tamper me").unwrap();

        for byte in 0..encrypted.len() {
            for bit in 0..8 {
                let mut tampered = encrypted.clone();
                tampered[byte] ^= 1 << bit;
                assert_eq!(
                    key.decrypt(&tampered),
                    Err(DecryptionError::Authentication),
                    "flip at byte {} bit {} was not detected",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_truncated_ciphertext() {
        let key = FileKey::generate().unwrap();
        assert!(matches!(
            key.decrypt(&[0u8; NONCE_SIZE + TAG_SIZE - 1]),
            Err(DecryptionError::Truncated { .. })
        ));
    }

    #[test]
    fn test_file_key_size_validation() {
        assert!(FileKey::from_slice(&[1u8; 16]).is_err());
        assert!(FileKey::from_slice(&[1u8; 64]).is_err());
        assert!(FileKey::from_slice(&[1u8; SECRET_SIZE]).is_ok());
    }
}
