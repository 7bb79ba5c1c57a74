pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "securedag")]
#[command(about = "Wallet-derived encryption keys and encrypted file sharing")]
pub struct Args {
    /// Path to the securedag state directory (defaults to ~/.securedag)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Log level written to stderr, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: crate::Command,
}
