//! Integration tests for session key derivation, caching and file upload

mod common;

use std::sync::Arc;

use ::common::blobs::BlobStore;
use ::common::cache::{MemoryStore, SignatureCache};
use ::common::crypto::{encoding, DocumentHash};
use ::common::ledger::{Ledger, ModuleKind};
use ::common::session::{unlock_keys, KeySource, SessionConfig, SessionError};
use ::common::wallet::Wallet;

#[tokio::test]
async fn test_upload_download_roundtrip() {
    let network = common::TestNetwork::new();
    let alice = network.user().await;

    let receipt = alice
        .upload_file("labs.pdf", b"hello world", ModuleKind::MediVault)
        .await
        .unwrap();
    assert_eq!(receipt.document_hash, DocumentHash::compute(b"hello world"));

    // only ciphertext reaches the blob store
    let stored = network.blobs.get(&receipt.cid).await.unwrap();
    assert_ne!(stored.as_deref(), Some(b"hello world".as_slice()));

    assert_eq!(
        alice.download_file(receipt.file_id).await.unwrap(),
        b"hello world"
    );

    let files = alice.my_files().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_name, "labs.pdf");
    assert_eq!(files[0].cid, receipt.cid);
}

#[tokio::test]
async fn test_keys_are_registered_on_ledger() {
    let network = common::TestNetwork::new();
    let alice = network.user().await;

    let record = network
        .ledger
        .get_encryption_key(alice.address())
        .await
        .unwrap()
        .unwrap();
    let keys = alice.keys().unwrap();
    assert!(record.is_active);
    assert_eq!(
        record.public_key,
        encoding::to_prefixed_hex(keys.encryption_public_key().as_bytes())
    );
    assert_eq!(record.version, alice.config().key_version);
}

#[tokio::test]
async fn test_cached_signature_skips_wallet_prompt() {
    let network = common::TestNetwork::new();
    let cache = Arc::new(MemoryStore::new());
    let wallet = Arc::new(common::FixedWallet::new(
        common::address(0xaa),
        common::deadbeef_signature(),
    ));

    let first = network.connect(wallet.clone(), cache.clone());
    let public_key = first.derive_and_register_keys().await.unwrap();
    assert_eq!(wallet.prompts(), 1);
    assert_eq!(cache.len(), 1);

    let second = network.connect(wallet.clone(), cache.clone());
    assert_eq!(second.restore_keys_from_cache(), Some(public_key));
    assert_eq!(second.derive_and_register_keys().await.unwrap(), public_key);
    assert_eq!(wallet.prompts(), 1);
}

#[tokio::test]
async fn test_unlock_without_ledger_shares_session_cache() {
    let network = common::TestNetwork::new();
    let cache = Arc::new(MemoryStore::new());
    let wallet = Arc::new(common::FixedWallet::new(
        common::address(0xaa),
        common::deadbeef_signature(),
    ));
    let signatures = SignatureCache::new(cache.clone());
    let config = SessionConfig::default();

    let (bundle, source) = unlock_keys(&*wallet, &signatures, &config)
        .await
        .unwrap();
    assert_eq!(source, KeySource::Wallet);
    assert_eq!(wallet.prompts(), 1);
    assert!(!network
        .ledger
        .has_encryption_key(wallet.address())
        .await
        .unwrap());

    // a session over the same cache restores without prompting
    let session = network.connect(wallet.clone(), cache.clone());
    assert_eq!(
        session.restore_keys_from_cache(),
        Some(bundle.encryption_public_key())
    );

    let (again, source) = unlock_keys(&*wallet, &signatures, &config)
        .await
        .unwrap();
    assert_eq!(source, KeySource::Cache);
    assert_eq!(again.encryption_public_key(), bundle.encryption_public_key());
    assert_eq!(wallet.prompts(), 1);
}

#[tokio::test]
async fn test_disconnect_clears_cached_signature() {
    let network = common::TestNetwork::new();
    let cache = Arc::new(MemoryStore::new());
    let wallet = Arc::new(common::FixedWallet::new(
        common::address(0xaa),
        common::deadbeef_signature(),
    ));

    let session = network.connect(wallet.clone(), cache.clone());
    session.derive_and_register_keys().await.unwrap();
    session.disconnect();
    assert!(cache.is_empty());

    let next = network.connect(wallet.clone(), cache.clone());
    assert_eq!(next.restore_keys_from_cache(), None);
    next.derive_and_register_keys().await.unwrap();
    assert_eq!(wallet.prompts(), 2);
}

#[tokio::test]
async fn test_file_operations_need_keys() {
    let network = common::TestNetwork::new();
    let wallet = Arc::new(common::FixedWallet::new(
        common::address(0xaa),
        common::deadbeef_signature(),
    ));
    let session = network.connect(wallet, Arc::new(MemoryStore::new()));
    assert!(session.keys().is_none());
    assert!(matches!(
        session
            .upload_file("a.txt", b"data", ModuleKind::MediVault)
            .await,
        Err(SessionError::KeysNotDerived)
    ));
}

#[tokio::test]
async fn test_same_signature_opens_files_in_new_session() {
    let network = common::TestNetwork::new();
    let wallet = Arc::new(common::FixedWallet::new(
        common::address(0xaa),
        common::deadbeef_signature(),
    ));

    let first = network.connect(wallet.clone(), Arc::new(MemoryStore::new()));
    first.derive_and_register_keys().await.unwrap();
    let receipt = first
        .upload_file("scan.png", b"hello world", ModuleKind::BioKey)
        .await
        .unwrap();
    first.disconnect();

    // a different device with an empty cache re-derives the same keys
    let second = network.connect(wallet, Arc::new(MemoryStore::new()));
    second.derive_and_register_keys().await.unwrap();
    assert_eq!(
        second.download_file(receipt.file_id).await.unwrap(),
        b"hello world"
    );
}
