//! Hex and base64 helpers shared by the key and blob types.
//!
//! Hex output is always lowercase without separators. Hex input may carry an
//! optional `0x` prefix, which is stripped before decoding.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid length, expected {expected}, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// Strip an optional `0x` / `0X` prefix
pub fn strip_hex_prefix(hex: &str) -> &str {
    hex.strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex)
}

pub fn to_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(data)
}

/// Lowercase hex with a `0x` prefix, the form the ledger expects for `bytes` arguments
pub fn to_prefixed_hex(data: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(data))
}

pub fn from_hex(hex: &str) -> Result<Vec<u8>, EncodingError> {
    Ok(hex::decode(strip_hex_prefix(hex))?)
}

/// Decode hex into a fixed-size array, rejecting any other length
pub fn from_hex_array<const N: usize>(hex: &str) -> Result<[u8; N], EncodingError> {
    let hex = strip_hex_prefix(hex);
    if hex.len() != N * 2 {
        return Err(EncodingError::Length {
            expected: N,
            actual: hex.len() / 2,
        });
    }
    let mut buff = [0u8; N];
    hex::decode_to_slice(hex, &mut buff)?;
    Ok(buff)
}

pub fn to_base64(data: impl AsRef<[u8]>) -> String {
    BASE64.encode(data)
}

pub fn from_base64(data: &str) -> Result<Vec<u8>, EncodingError> {
    Ok(BASE64.decode(data)?)
}
