//! execnode daemon
//!
//! Minimal TCP agent for remote file transfer and shell execution.
//! One request per connection: the client sends a framed JSON envelope,
//! the server authenticates it against the shared secret, performs the
//! requested file or process operation, and replies with a JSON result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use execnode::{config::Config, server};

#[derive(Parser, Debug)]
#[command(name = "execnode")]
#[command(about = "Minimal TCP agent for remote file transfer and shell execution")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr so stdout stays clean for process wrappers)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // An explicitly requested config file must load; the default location
    // falls back to generated defaults.
    let config = match args.config {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load_or_generate(),
    };

    info!(
        port = config.port,
        base_dir = %config.base_dir().display(),
        auth_enabled = !config.secret_key.is_empty(),
        "loaded configuration"
    );

    server::serve(config).await
}
