//! HKDF-SHA256 and SHA-256 wrappers
//!
//! Thin, stateless wrappers so the rest of the crate never touches the
//! `hkdf` / `sha2` APIs directly.

use hkdf::Hkdf;
use sha2::{Digest, Sha256};

/// Size of a SHA-256 digest in bytes
pub const SHA256_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum KdfError {
    #[error("requested output length {0} is too long for HKDF-SHA256")]
    InvalidLength(usize),
}

/// HKDF extract-and-expand over SHA-256, filling `okm`.
///
/// A `None` or empty salt is equivalent to a salt of `SHA256_SIZE` zero bytes.
pub fn hkdf_sha256(
    ikm: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    okm: &mut [u8],
) -> Result<(), KdfError> {
    let hk = Hkdf::<Sha256>::new(salt, ikm);
    hk.expand(info, okm)
        .map_err(|_| KdfError::InvalidLength(okm.len()))
}

pub fn sha256(data: &[u8]) -> [u8; SHA256_SIZE] {
    Sha256::digest(data).into()
}
