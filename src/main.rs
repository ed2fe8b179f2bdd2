//! tcp-path-router
//!
//! Serves canned responses for up to five URL paths to one TCP client at a time.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                   TCP PATH ROUTER                    │
//!                 │                                                      │
//!   Client        │  ┌──────────┐   ┌───────────┐   ┌────────────────┐  │
//!   ──────────────┼─▶│   net    │──▶│   http    │──▶│    routing     │  │
//!                 │  │ listener │   │  engine   │   │ matcher/table  │  │
//!                 │  └──────────┘   └─────┬─────┘   └───────┬────────┘  │
//!                 │                       │                 ▼           │
//!   ◀─────────────┼───── transport ◀──────┴────────── dispatcher        │
//!                 │                                                      │
//!                 │  config · lifecycle · observability                  │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use tcp_path_router::config::loader::load_config;
use tcp_path_router::config::watcher::ConfigWatcher;
use tcp_path_router::config::RouterConfig;
use tcp_path_router::lifecycle::signals::wait_for_shutdown_signal;
use tcp_path_router::lifecycle::startup::build_server;
use tcp_path_router::observability::{logging, metrics};
use tcp_path_router::Observers;

#[derive(Parser)]
#[command(name = "tcp-path-router")]
#[command(about = "Single-client TCP server routing HTTP GET paths to canned responses", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listening port
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose per-event logging
    #[arg(long)]
    debug: bool,

    /// Reload the terminator and debug flag when the config file changes
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.server.debug |= cli.debug;

    logging::init_logging(&config.observability, config.server.debug)?;
    tracing::info!("tcp-path-router v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let base_dir = cli
        .config
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let startup_config = config.clone();
    let mut server = build_server(config, &base_dir)?;
    server.set_observers(
        Observers::new()
            .on_connect(|conn| tracing::info!(peer_addr = %conn.peer(), "Client connected"))
            .on_disconnect(|conn| tracing::info!(peer_addr = %conn.peer(), "Client disconnected"))
            .on_reconnect(|conn, code| {
                tracing::warn!(peer_addr = %conn.peer(), error_code = code, "Client connection failed")
            }),
    );

    let handle = server.start().await?;

    // Held for the lifetime of the server; dropping it stops watching.
    let _watcher = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, mut updates) = ConfigWatcher::new(path, startup_config);
            let guard = watcher.run()?;
            let reload = handle.clone();
            tokio::spawn(async move {
                while let Some(settings) = updates.recv().await {
                    match reload.apply_settings(&settings) {
                        Ok(()) => tracing::info!(
                            terminator = %settings.terminator.escape_debug(),
                            debug = settings.debug,
                            "Configuration reloaded"
                        ),
                        Err(e) => tracing::error!(error = %e, "Failed to apply configuration"),
                    }
                }
            });
            Some(guard)
        }
        _ => None,
    };

    wait_for_shutdown_signal().await;
    handle.stop().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
