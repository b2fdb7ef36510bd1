//! Crop price prediction CLI
//!
//! Reads one JSON request from stdin, writes one JSON response to stdout and
//! exits with the response status (0 success, 1 invalid input, 2 model
//! failure with fallback price).

use anyhow::{Context, Result};
use clap::Parser;
use cropprice_service::{InferenceService, ServiceConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "price-predict")]
#[command(author = "CropPrice Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Predict a crop price from a JSON request on stdin", long_about = None)]
struct Args {
    /// TOML configuration file (environment variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured model artifact path
    #[arg(short, long)]
    model: Option<PathBuf>,
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config =
        ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(model) = args.model {
        config.model_path = model;
    }
    init_logging(&config.log_level)?;

    let mut payload = String::new();
    tokio::io::stdin()
        .read_to_string(&mut payload)
        .await
        .context("Failed to read request from stdin")?;

    let service = Arc::new(InferenceService::from_config(&config));
    let outcome = match config.timeout() {
        Some(duration) => service.handle_payload_with_timeout(&payload, duration).await,
        None => service.handle_payload(&payload),
    };
    debug!(status = outcome.status.code(), "request answered");

    let mut stdout = tokio::io::stdout();
    stdout.write_all(outcome.to_json().as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;

    std::process::exit(outcome.status.code());
}
