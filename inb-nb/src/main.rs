//! inb-nb (Notebook) - Student inquiry notebook service
//!
//! Serves daily entries over HTTP, persisting them to the configured
//! document store with a local cache for offline reads and pending writes.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use inb_common::ai::AiHelper;
use inb_common::autosave::AutoSaver;
use inb_common::cache::LocalCache;
use inb_common::config::{AppConfig, ConfigOverrides, StoreBackend, CONFIG_PATH_ENV, ROOT_FOLDER_ENV};
use inb_common::EntryRepository;
use inb_nb::{build_router, AppState, DEFAULT_PORT};
use tokio::signal;
use tracing::info;

/// Command-line arguments for inb-nb
#[derive(Parser, Debug)]
#[command(name = "inb-nb")]
#[command(about = "Inquiry notebook service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "INB_NB_PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "INB_NB_BIND")]
    bind: IpAddr,

    /// Root folder holding the SQLite store and the local cache
    #[arg(short, long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Document store backend (sqlite or firestore)
    #[arg(long)]
    store: Option<StoreBackend>,

    /// Route AI requests through the proxy service instead of calling providers
    #[arg(long)]
    use_proxy: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = ConfigOverrides {
        root_folder: args.root_folder.clone(),
        config_path: args.config.clone(),
        store_backend: args.store,
        use_proxy: args.use_proxy,
    };
    let config = AppConfig::load(&overrides).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "Starting Inquiry Notebook (inb-nb) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Root folder: {}", config.root_folder.display());

    std::fs::create_dir_all(&config.root_folder).with_context(|| {
        format!("Failed to create root folder {}", config.root_folder.display())
    })?;

    let store = config
        .build_store()
        .await
        .context("Failed to open document store")?;
    info!("✓ Document store ready ({})", store.backend_name());

    let cache = LocalCache::new(config.cache_dir());
    let repo = Arc::new(EntryRepository::new(store, cache));

    let ai = AiHelper::from_settings(&config.ai).context("Failed to initialize AI helper")?;
    if ai.uses_proxy() {
        info!("AI requests go through proxy at {}", config.ai.proxy_base_url);
    } else {
        info!("AI requests go directly to providers");
    }

    let autosaver = AutoSaver::new(Arc::clone(&repo), config.autosave_debounce);
    let state = AppState::new(repo, ai, autosaver.clone());
    let app = build_router(state);

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("inb-nb listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let pending = autosaver.pending_count().await;
    if pending > 0 {
        info!("Flushing {} pending draft(s)", pending);
        autosaver.flush_all().await;
    }

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
