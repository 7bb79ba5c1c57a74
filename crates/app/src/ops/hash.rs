use std::path::PathBuf;

use clap::Args;
use common::crypto::{encoding::EncodingError, DocumentHash};

/// Print the SHA-256 document hash of a file, or check it against an expected one
#[derive(Args, Debug, Clone)]
pub struct Hash {
    pub path: PathBuf,

    /// Expected hash (hex); fails if the file does not match
    #[arg(long)]
    pub expect: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("invalid expected hash: {0}")]
    InvalidExpected(#[from] EncodingError),
    #[error("hash mismatch: expected {expected}, got {actual}")]
    Mismatch {
        expected: DocumentHash,
        actual: DocumentHash,
    },
}

#[async_trait::async_trait]
impl crate::op::Op for Hash {
    type Error = HashError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|e| HashError::Read(self.path.clone(), e))?;
        let actual = DocumentHash::compute(&data);

        match &self.expect {
            None => Ok(actual.to_hex()),
            Some(expected) => {
                let expected = DocumentHash::from_hex(expected)?;
                if expected != actual {
                    return Err(HashError::Mismatch { expected, actual });
                }
                Ok(format!("OK {}", actual))
            }
        }
    }
}
