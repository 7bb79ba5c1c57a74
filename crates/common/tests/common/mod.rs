//! Shared test utilities for session integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::blobs::{BlobStore, MemoryBlobStore};
use common::cache::{KeyValueStore, MemoryStore};
use common::crypto::WalletSignature;
use common::ledger::{Address, Ledger, MemoryLedger};
use common::session::{Session, SessionConfig};
use common::wallet::{LocalWallet, Wallet, WalletError};

/// `0xdeadbeef` repeated to a 64-byte signature
pub fn deadbeef_signature() -> WalletSignature {
    WalletSignature::from_hex(&format!("0x{}", "deadbeef".repeat(16))).unwrap()
}

pub fn address(byte: u8) -> Address {
    Address::parse(&format!("0x{}", format!("{:02x}", byte).repeat(20))).unwrap()
}

/// A wallet that returns the same signature for every message and counts
/// how often it was asked
#[derive(Debug)]
pub struct FixedWallet {
    address: Address,
    signature: WalletSignature,
    prompts: AtomicUsize,
}

impl FixedWallet {
    pub fn new(address: Address, signature: WalletSignature) -> Self {
        Self {
            address,
            signature,
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Wallet for FixedWallet {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn sign_message(&self, _message: &str) -> Result<WalletSignature, WalletError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        Ok(self.signature.clone())
    }
}

/// Ledger, blob store and cache shared between every user of a test
#[derive(Clone)]
pub struct TestNetwork {
    pub ledger: Arc<MemoryLedger>,
    pub blobs: Arc<MemoryBlobStore>,
}

impl TestNetwork {
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(MemoryLedger::new()),
            blobs: Arc::new(MemoryBlobStore::new()),
        }
    }

    pub fn connect(&self, wallet: Arc<dyn Wallet>, cache: Arc<dyn KeyValueStore>) -> Session {
        Session::connect(
            SessionConfig::default(),
            wallet,
            self.ledger.clone() as Arc<dyn Ledger>,
            self.blobs.clone() as Arc<dyn BlobStore>,
            cache,
        )
    }

    /// Connect a fresh local wallet and register its keys
    pub async fn user(&self) -> Session {
        let wallet = Arc::new(LocalWallet::generate().unwrap());
        let session = self.connect(wallet, Arc::new(MemoryStore::new()));
        session.derive_and_register_keys().await.unwrap();
        session
    }
}
