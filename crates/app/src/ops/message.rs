use clap::Args;
use common::crypto::{build_message, MessageOptions};
use common::wallet::Wallet;

use crate::state::StateError;

/// Print the message the wallet signs to derive keys
#[derive(Args, Debug, Clone)]
pub struct Message {
    /// Override the issued-at timestamp
    #[arg(long)]
    pub issued_at: Option<String>,

    /// Override the nonce
    #[arg(long)]
    pub nonce: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Message {
    type Error = MessageError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let wallet = state.load_wallet()?;
        let config = state.session_config()?;
        let built = build_message(
            wallet.address().as_str(),
            config.chain_id,
            config.key_version,
            MessageOptions {
                domain: Some(config.domain),
                issued_at: self.issued_at.clone(),
                nonce: self.nonce.clone(),
            },
        );
        Ok(built.message)
    }
}
