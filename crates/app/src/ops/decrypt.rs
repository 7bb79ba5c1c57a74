use std::path::PathBuf;

use clap::Args;
use common::blobs::{BlobStore, BlobStoreError};
use common::crypto::{decrypt_file, DecryptionError, EncryptedFileKey};

use super::keys::{unlock, KeysError};
use crate::state::StateError;

/// Recover a file from the local blob store
#[derive(Args, Debug, Clone)]
pub struct Decrypt {
    /// Content address printed by `encrypt`
    pub cid: String,

    /// Encrypted file key printed by `encrypt` (hex)
    pub encrypted_key: String,

    /// Write the plaintext here instead of printing it (required for binary files)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error(transparent)]
    Keys(#[from] KeysError),
    #[error("invalid CID {0}: {1}")]
    InvalidCid(String, cid::Error),
    #[error("blob {0} not found")]
    NotFound(String),
    #[error("decryption error: {0}")]
    Decryption(#[from] DecryptionError),
    #[error("blob store error: {0}")]
    Blobs(#[from] BlobStoreError),
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("plaintext is not valid UTF-8 ({0} bytes), pass --output to write it to a file")]
    Binary(usize),
}

#[async_trait::async_trait]
impl crate::op::Op for Decrypt {
    type Error = DecryptError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let cid = cid::Cid::try_from(self.cid.as_str())
            .map_err(|e| DecryptError::InvalidCid(self.cid.clone(), e))?;
        let sealed = EncryptedFileKey::from_hex(&self.encrypted_key)?;

        let (_, keys, _) = unlock(&state, false).await?;
        let file_key = sealed.recover(keys.encryption_secret_key())?;

        let blob = state
            .blob_store()
            .await?
            .get(&cid)
            .await?
            .ok_or_else(|| DecryptError::NotFound(self.cid.clone()))?;
        let plaintext = decrypt_file(&blob, &file_key)?;

        match &self.output {
            Some(path) => {
                tokio::fs::write(path, &plaintext)
                    .await
                    .map_err(|e| DecryptError::Write(path.clone(), e))?;
                Ok(format!("Wrote {} bytes to {}", plaintext.len(), path.display()))
            }
            None => String::from_utf8(plaintext)
                .map_err(|e| DecryptError::Binary(e.as_bytes().len())),
        }
    }
}
