//! Omegatron gateway binary entry point.
//!
//! Loads configuration, initializes logging, builds the provider adapters and
//! the model registry, then serves the HTTP API until ctrl-c.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use omegatron::providers::build_adapters;
use omegatron::utils::build_client;
use omegatron::{GatewayConfig, RequestRouter, server, telemetry};

/// OpenAI-compatible chat completion gateway
#[derive(Debug, Parser)]
#[command(name = "omegatron", version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "OMEGATRON_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides `server.listen`
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = GatewayConfig::load(args.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = telemetry::init_subscriber(&config.logging)?;
    if let Some(path) = &args.config {
        tracing::info!("loaded configuration from {}", path.display());
    }

    let client = build_client(&config.http)?;
    let adapters = build_adapters(&config, client);
    let router = Arc::new(RequestRouter::new(adapters, config.router_options())?);

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;

    server::serve(listener, router, shutdown_signal()).await?;

    tracing::info!("gateway shut down");
    Ok(())
}

/// Wait for ctrl-c.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
