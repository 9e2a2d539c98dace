//! Binary entrypoint for the signage server.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use rust_signage::config::Configuration;
use rust_signage::{logging, web};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Full-screen media slideshow server
#[derive(Debug, Parser)]
#[command(name = "signage", version, about = "Serve a looping image and video slideshow")]
struct Cli {
    /// Path to YAML config file; built-in defaults apply when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the media root directory
    #[arg(long, value_name = "DIR")]
    media_root: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    if let Err(err) = try_main().await {
        error!(error = ?err, "signage exited with error");
        std::process::exit(1);
    }
}

async fn try_main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(port) = cli.port {
        cfg.port = port;
    }
    if let Some(root) = cli.media_root {
        cfg.media_root = root;
    }
    let cfg = cfg.validated().context("validating configuration")?;

    if !cfg.media_root.is_dir() {
        info!(media_root = %cfg.media_root.display(), "media root does not exist yet; playlists will 404");
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        web::shutdown_signal().await;
        info!("interrupt received");
        on_signal.cancel();
    });

    web::serve(cfg, cancel).await
}
