// ABOUTME: Main entry point wiring config, runtime, session store, and adapters.
// ABOUTME: Initializes logging, builds the router, and serves adapter streams.

use anyhow::{Context, Result};
use clap::Parser;
use courier::config::Config;
use courier::paths;
use courier::platform::ConsoleAdapter;
use courier::router::Router;
use courier::{ChannelAdapter, RuntimeRegistry, SessionStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "courier", about = "Chat-to-agent bridge with streamed progress")]
struct Cli {
    /// Path to config.toml (defaults to the XDG config dir, then ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Log panics before they crash the process
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        eprintln!("Backtrace:\n{:?}", std::backtrace::Backtrace::force_capture());
    }));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting courier");

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    tracing::info!(
        runtime = %config.runtime.backend_type,
        turn_timeout_secs = config.router.turn_timeout_secs,
        allowed_peers = config.router.allowed_peers.len(),
        progress = config.progress.enabled,
        "Configuration loaded"
    );

    let store = SessionStore::new(paths::data_dir())?;

    let registry = RuntimeRegistry::default();
    let runtime = registry
        .create(&config.runtime.backend_type, &config.runtime_options())
        .with_context(|| {
            format!(
                "Failed to create runtime backend '{}' (available: {:?})",
                config.runtime.backend_type,
                registry.available()
            )
        })?;
    tracing::info!(runtime = runtime.name(), "Agent runtime ready");

    let router = Arc::new(Router::new(runtime, store, Arc::new(config.clone())));

    let mut adapters: Vec<Arc<dyn ChannelAdapter>> = Vec::new();
    if config.channels.console {
        adapters.push(Arc::new(ConsoleAdapter::new()));
    }
    if adapters.is_empty() {
        anyhow::bail!("No channel adapters enabled; enable channels.console or register one");
    }

    let mut handles = Vec::new();
    for adapter in adapters {
        let router = Arc::clone(&router);
        handles.push(tokio::spawn(async move {
            if let Err(e) = router.run_adapter(adapter).await {
                tracing::error!(error = %e, "Adapter exited with error");
            }
        }));
    }

    tracing::info!("courier ready - send a message or /help for commands");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        }
        _ = futures_util::future::join_all(&mut handles) => {
            tracing::info!("All adapters stopped");
        }
    }

    Ok(())
}
