//! inb-px (Proxy) - AI provider proxy
//!
//! Forwards chat, search and video requests to OpenAI, Perplexity and
//! YouTube using keys that only this process reads.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use inb_common::config::{AppConfig, ConfigOverrides, CONFIG_PATH_ENV};
use inb_px::{build_router, ProxyState, DEFAULT_PORT};
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for inb-px
#[derive(Parser, Debug)]
#[command(name = "inb-px")]
#[command(about = "AI proxy for the inquiry notebook")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "INB_PX_PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "INB_PX_BIND")]
    bind: IpAddr,

    /// TOML configuration file
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = ConfigOverrides {
        config_path: args.config.clone(),
        ..Default::default()
    };
    let config = AppConfig::load(&overrides).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "Starting Inquiry Notebook AI proxy (inb-px) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let state = ProxyState::from_settings(&config.ai).context("Failed to create provider clients")?;
    for (provider, configured) in [
        ("OpenAI", state.openai.is_some()),
        ("Perplexity", state.perplexity.is_some()),
        ("YouTube", state.youtube.is_some()),
    ] {
        if configured {
            info!("✓ {} key configured", provider);
        } else {
            warn!("{} key not configured; its endpoint will answer 500", provider);
        }
    }

    let app = build_router(state);

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("inb-px listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
