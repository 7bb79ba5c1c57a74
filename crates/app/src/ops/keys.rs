use clap::Args;
use common::crypto::{encoding, KeyPairBundle};
use common::session::{unlock_keys, KeySource, SessionError};
use common::wallet::{LocalWallet, Wallet};

use crate::state::{AppState, StateError};

/// Derive (or restore cached) encryption keys for the local wallet
#[derive(Args, Debug, Clone)]
pub struct Keys {
    /// Drop the cached signature and sign afresh
    #[arg(long)]
    pub clear_cache: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum KeysError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// The local wallet's key bundle, restored from the signature cache when
/// possible and signed afresh otherwise
pub async fn unlock(
    state: &AppState,
    clear_cache: bool,
) -> Result<(LocalWallet, KeyPairBundle, KeySource), KeysError> {
    let wallet = state.load_wallet()?;
    let config = state.session_config()?;
    let signatures = state.signature_cache()?;

    if clear_cache {
        signatures.clear(wallet.address().as_str(), config.key_version);
    }
    let (bundle, source) = unlock_keys(&wallet, &signatures, &config).await?;
    Ok((wallet, bundle, source))
}

#[async_trait::async_trait]
impl crate::op::Op for Keys {
    type Error = KeysError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let (wallet, bundle, source) = unlock(&state, self.clear_cache).await?;

        let source = match source {
            KeySource::Cache => "cached signature",
            KeySource::Wallet => "new wallet signature",
        };
        Ok(format!(
            "Address: {}\n\
             Key version: {}\n\
             Encryption public key: {}\n\
             Signing public key: {}\n\
             Derived from: {}",
            wallet.address(),
            bundle.version(),
            encoding::to_prefixed_hex(bundle.encryption_public_key().as_bytes()),
            encoding::to_prefixed_hex(bundle.signing_key_pair().public().to_bytes()),
            source,
        ))
    }
}
