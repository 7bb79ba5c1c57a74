use std::path::PathBuf;

use bytes::Bytes;
use clap::Args;
use common::blobs::{BlobStore, BlobStoreError};
use common::crypto::{encrypt_file, encrypt_file_key, DocumentHash, FileKey, SecretError, SecretShareError};

use super::keys::{unlock, KeysError};
use crate::state::StateError;

/// Encrypt a file into the local blob store under a fresh file key
#[derive(Args, Debug, Clone)]
pub struct Encrypt {
    /// File to encrypt
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum EncryptError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error(transparent)]
    Keys(#[from] KeysError),
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("encryption error: {0}")]
    Secret(#[from] SecretError),
    #[error("file key sealing error: {0}")]
    SecretShare(#[from] SecretShareError),
    #[error("blob store error: {0}")]
    Blobs(#[from] BlobStoreError),
}

#[async_trait::async_trait]
impl crate::op::Op for Encrypt {
    type Error = EncryptError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|e| EncryptError::Read(self.path.clone(), e))?;
        let (_, keys, _) = unlock(&state, false).await?;

        let file_key = FileKey::generate()?;
        let ciphertext = encrypt_file(&data, &file_key)?;
        let cid = state.blob_store().await?.put(Bytes::from(ciphertext)).await?;

        // sealed to our own key so only this wallet can reopen it
        let sealed = encrypt_file_key(
            &file_key,
            &keys.encryption_public_key(),
            keys.encryption_secret_key(),
        )?;

        tracing::info!(%cid, bytes = data.len(), "encrypted file");
        Ok(format!(
            "CID: {}\n\
             Document hash: {}\n\
             Encrypted file key: {}",
            cid,
            DocumentHash::compute(&data),
            sealed.to_hex(),
        ))
    }
}
