use clap::Args;
use common::wallet::Wallet;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Chain id embedded in the derivation message
    #[arg(long, default_value_t = common::session::DEFAULT_CHAIN_ID)]
    pub chain_id: u64,

    /// Domain embedded in the derivation message
    #[arg(long, default_value = common::crypto::DEFAULT_DOMAIN)]
    pub domain: String,

    /// Key version to derive (1-10)
    #[arg(long, default_value_t = 1)]
    pub key_version: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            chain_id: self.chain_id,
            domain: self.domain.clone(),
            key_version: self.key_version,
            ..Default::default()
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;
        let wallet = state.load_wallet()?;

        let output = format!(
            "Initialized securedag directory at: {}\n\
             - Wallet: {}\n\
             - Address: {}\n\
             - Blobs: {}\n\
             - Cache: {}\n\
             - Config: {}\n\
             - Chain ID: {}\n\
             - Key version: {}",
            state.securedag_dir.display(),
            state.wallet_path.display(),
            wallet.address(),
            state.blobs_path.display(),
            state.cache_path.display(),
            state.config_path.display(),
            state.config.chain_id,
            state.config.key_version,
        );

        Ok(output)
    }
}
