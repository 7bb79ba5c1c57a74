mod args;
mod op;
mod ops;
mod state;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Decrypt, Encrypt, Hash, Init, Keys, Message, Version};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

command_enum! {
    (Init, Init),
    (Message, Message),
    (Keys, Keys),
    (Encrypt, Encrypt),
    (Decrypt, Decrypt),
    (Hash, Hash),
    (Version, Version),
}

/// Install a compact stderr subscriber. The guard must outlive the program.
fn init_logging(level: tracing::Level) -> tracing_appender::non_blocking::WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(writer)
        .with_filter(env_filter);
    tracing_subscriber::registry().with(layer).init();
    guard
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let log_level: tracing::Level = args.log_level.parse().unwrap_or(tracing::Level::WARN);
    let guard = init_logging(log_level);

    let ctx = op::OpContext::new(args.config_path);

    // exit explicitly only after the log guard has flushed
    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };
    drop(guard);
    std::process::exit(code);
}
