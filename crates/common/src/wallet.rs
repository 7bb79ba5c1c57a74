//! The account that signs the key-derivation message
//!
//! A real deployment plugs an external wallet in behind [`Wallet`].
//! [`LocalWallet`] keeps an Ed25519 key on disk and signs deterministically,
//! so the same message always yields the same derived keys.

use async_trait::async_trait;

use crate::crypto::{sha256, KeyError, SigningKeyPair, WalletSignature};
use crate::ledger::{Address, AddressError};

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("signature request rejected")]
    Rejected,
    #[error("wallet key error: {0}")]
    Key(#[from] KeyError),
    #[error("wallet address error: {0}")]
    Address(#[from] AddressError),
    #[error("unhandled wallet error: {0}")]
    Default(#[from] anyhow::Error),
}

#[async_trait]
pub trait Wallet: Send + Sync + std::fmt::Debug {
    fn address(&self) -> &Address;

    /// Sign a human-readable message. The same message must always produce
    /// the same signature for derived keys to be recoverable.
    async fn sign_message(&self, message: &str) -> Result<WalletSignature, WalletError>;
}

/// A wallet backed by a local Ed25519 key
#[derive(Clone)]
pub struct LocalWallet {
    key: SigningKeyPair,
    address: Address,
}

impl LocalWallet {
    pub fn new(key: SigningKeyPair) -> Result<Self, WalletError> {
        let address = Address::from_digest(&sha256(&key.public().to_bytes()))?;
        Ok(Self { key, address })
    }

    pub fn generate() -> Result<Self, WalletError> {
        Self::new(SigningKeyPair::generate()?)
    }

    pub fn from_pem(pem: &str) -> Result<Self, WalletError> {
        Self::new(SigningKeyPair::from_pem(pem)?)
    }

    pub fn to_pem(&self) -> String {
        self.key.to_pem()
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LocalWallet({})", self.address)
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn sign_message(&self, message: &str) -> Result<WalletSignature, WalletError> {
        let signature = self.key.sign(message.as_bytes());
        Ok(WalletSignature::from_bytes(signature.to_bytes().to_vec())
            .map_err(|e| anyhow::anyhow!("wallet produced an unusable signature: {}", e))?)
    }
}
