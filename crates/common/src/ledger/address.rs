use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crypto::encoding;

/// Length of an account address in bytes
pub const ADDRESS_SIZE: usize = 20;

#[derive(Debug, thiserror::Error)]
#[error("invalid account address: {0}")]
pub struct AddressError(String);

/// A `0x`-prefixed 20-byte account address
///
/// The string is kept exactly as given, since it is part of the signed
/// derivation message. Equality and hashing ignore case.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        let hex = address
            .strip_prefix("0x")
            .ok_or_else(|| AddressError(address.to_string()))?;
        if hex.len() != ADDRESS_SIZE * 2 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressError(address.to_string()));
        }
        Ok(Self(address.to_string()))
    }

    /// Address from the trailing bytes of a digest
    pub fn from_digest(digest: &[u8]) -> Result<Self, AddressError> {
        if digest.len() < ADDRESS_SIZE {
            return Err(AddressError(encoding::to_hex(digest)));
        }
        let tail = &digest[digest.len() - ADDRESS_SIZE..];
        Ok(Self(encoding::to_prefixed_hex(tail)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_lowercase(&self) -> String {
        self.0.to_lowercase()
    }

    /// `0x1234…abcd` form for log lines
    pub fn short(&self) -> String {
        format!("{}…{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_lowercase().hash(state);
    }
}

impl FromStr for Address {
    type Err = AddressError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}
