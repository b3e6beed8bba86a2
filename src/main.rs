//! vitals-server
//!
//! ```bash
//! vitals-server --bind 127.0.0.1:8080
//! vitals-server --config rpc.json --max-batch-size 50 --log-level debug
//! RUST_LOG=typed_rpc=trace vitals-server
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use typed_rpc::{RpcConfig, rpc_routes, serve};
use vitals_app::{AppContextFactory, MemoryStore, Sha256Digest, create_dispatcher};

/// Users and health profiles over batched typed RPC.
#[derive(Parser, Debug)]
#[command(name = "vitals-server")]
#[command(version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080", env = "VITALS_BIND")]
    bind: SocketAddr,

    /// JSON file with an RpcConfig; absent fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the server's maximum calls per batch.
    #[arg(long)]
    max_batch_size: Option<usize>,

    /// Log level when RUST_LOG is unset.
    #[arg(long, default_value = "info", env = "VITALS_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = load_config(&args)?;
    config.validate().context("Invalid RPC configuration")?;

    let factory = AppContextFactory::new(MemoryStore::new(), Sha256Digest::with_random_salt());
    let dispatcher = Arc::new(create_dispatcher(factory, config)?);
    info!(
        procedures = dispatcher.router().procedure_count(),
        fingerprint = %dispatcher.contract().fingerprint,
        "Shared procedure references verified"
    );

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    serve(listener, rpc_routes(dispatcher), shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

fn load_config(args: &Args) -> Result<RpcConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            RpcConfig::from_json(&raw)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => RpcConfig::default(),
    };

    if let Some(size) = args.max_batch_size {
        config.batch_config.max_batch_size = size;
    }
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
