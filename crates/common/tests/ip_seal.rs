//! Integration tests for document timestamping and integrity checks

mod common;

use ::common::crypto::DocumentHash;
use ::common::ledger::{Ledger, LedgerError, ModuleKind};
use ::common::session::SessionError;

#[tokio::test]
async fn test_timestamp_and_verify() {
    let network = common::TestNetwork::new();
    let alice = network.user().await;

    let draft = b"a novel widget, claim 1";
    let receipt = alice
        .upload_file("patent.md", draft, ModuleKind::IpSeal)
        .await
        .unwrap();

    let hash = alice
        .timestamp_document(receipt.file_id, draft, "patent", "first draft")
        .await
        .unwrap();
    assert_eq!(hash, receipt.document_hash);

    let record = network
        .ledger
        .get_ip_timestamp(receipt.file_id)
        .await
        .unwrap();
    assert_eq!(record.document_hash, DocumentHash::compute(draft));
    assert_eq!(record.ip_type, "patent");

    assert!(alice.verify_document(receipt.file_id, draft).await.unwrap());
    assert!(!alice
        .verify_document(receipt.file_id, b"a novel widget, claim 2")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_only_owner_timestamps_once() {
    let network = common::TestNetwork::new();
    let alice = network.user().await;
    let bob = network.user().await;

    let receipt = alice
        .upload_file("song.wav", b"la la la", ModuleKind::IpSeal)
        .await
        .unwrap();

    assert!(matches!(
        bob.timestamp_document(receipt.file_id, b"la la la", "copyright", "")
            .await,
        Err(SessionError::Ledger(LedgerError::NotOwner(_)))
    ));

    alice
        .timestamp_document(receipt.file_id, b"la la la", "copyright", "")
        .await
        .unwrap();
    assert!(matches!(
        alice
            .timestamp_document(receipt.file_id, b"la la la", "copyright", "")
            .await,
        Err(SessionError::Ledger(LedgerError::AlreadyTimestamped(_)))
    ));
}

#[tokio::test]
async fn test_verify_without_timestamp() {
    let network = common::TestNetwork::new();
    let alice = network.user().await;
    let receipt = alice
        .upload_file("x", b"x", ModuleKind::IpSeal)
        .await
        .unwrap();
    assert!(matches!(
        alice.verify_document(receipt.file_id, b"x").await,
        Err(SessionError::Ledger(LedgerError::TimestampNotFound(_)))
    ));
}
