//! Search Session Proxy
//!
//! A local forward proxy for an upstream search engine, with per-client
//! server-side cookie sessions.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http server ──▶ POST /create-session ──▶ session store (allocate)
//!                          │
//!                          ├──▶ GET /          ──▶ resolver ──▶ static page
//!                          │
//!                          └──▶ /search/*      ──▶ resolver ──▶ mediator ──▶ Upstream
//!                                                  (store read)   (cookie       search
//!                                                                 injection)    engine
//!     Client Response
//!     ◀─────────────── upstream status/headers/body streamed back verbatim
//!
//!     Cross-cutting: config, logging + metrics, lifecycle (signals, shutdown),
//!                    session sweeper (idle expiry)
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use search_session_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use search_session_proxy::http::HttpServer;
use search_session_proxy::lifecycle::{signals, Shutdown};
use search_session_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "search-session-proxy")]
#[command(about = "Local search proxy with server-side cookie sessions", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "SEARCH_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(long)]
    bind: Option<String>,

    /// Override the upstream search target URL.
    #[arg(long)]
    upstream: Option<String>,
}

fn resolve_config(args: &Args) -> Result<ProxyConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    if let Some(bind) = &args.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(upstream) = &args.upstream {
        config.upstream.target = upstream.clone();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    logging::init_logging(&config.observability)?;

    tracing::info!("search-session-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.target,
        max_sessions = config.sessions.max_sessions,
        idle_ttl_secs = config.sessions.idle_ttl_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_task => {
            result??;
        }
        _ = signals::shutdown_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
