//! Transforming Reverse Proxy
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                  TRANSFORM PROXY                      │
//!                         │                                                       │
//!     Client Request      │  ┌─────────┐   ┌──────────────┐   ┌────────────────┐  │
//!     ────────────────────┼─▶│  http   │──▶│   routing    │──▶│   request      │  │
//!                         │  │ server  │   │  snapshot    │   │  transforms    │  │
//!                         │  └─────────┘   └──────────────┘   └───────┬────────┘  │
//!                         │                                           │           │
//!                         │                                           ▼           │
//!     Client Response     │  ┌──────────────┐               ┌────────────────┐    │
//!     ◀───────────────────┼──│  response    │◀──────────────│  http client   │◀───┼── Destination
//!                         │  │  transforms  │               │  (hyper-util)  │    │
//!                         │  └──────────────┘               └────────────────┘    │
//!                         │                                                       │
//!                         │  config (load, validate, watch) → route snapshot swap │
//!                         │  observability (tracing, metrics) · lifecycle         │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use transform_proxy::config::{load_config, ProxyConfig};
use transform_proxy::config::watcher::ConfigWatcher;
use transform_proxy::lifecycle::signals::spawn_reload_on_hangup;
use transform_proxy::lifecycle::{shutdown_signal, Shutdown};
use transform_proxy::observability::{logging, metrics};
use transform_proxy::routing::RouteSnapshot;
use transform_proxy::transforms::TransformBuilder;
use transform_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "transform-proxy")]
#[command(about = "Reverse proxy with per-route request and response transforms", long_about = None)]
struct Args {
    /// Configuration file (TOML, or JSON with a .json extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Compile every route, print all errors and exit
    #[arg(long)]
    validate: bool,

    /// Log level; overridden by RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    logging::init_logging(&level)?;

    if args.validate {
        return validate(&config);
    }

    tracing::info!("transform-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let _watcher = match &args.config {
        Some(path) => {
            spawn_reload_on_hangup(path.clone(), update_tx.clone());
            Some(ConfigWatcher::new(path, update_tx).run()?)
        }
        None => None,
    };

    let shutdown = Shutdown::new();
    shutdown.trigger_on(shutdown_signal());

    let server = HttpServer::new(config);
    server.run(listener, update_rx, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Compile every route and report each failure.
fn validate(config: &ProxyConfig) -> Result<(), Box<dyn std::error::Error>> {
    let builder = TransformBuilder::from_settings(&config.transforms);
    let (snapshot, errors) = RouteSnapshot::build(&config.routes, &builder);

    for error in &errors {
        eprintln!("error: {}", error);
    }
    println!(
        "{} of {} routes compiled, {} error(s)",
        snapshot.len(),
        config.routes.len(),
        errors.len()
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!("{} route error(s)", errors.len()).into())
    }
}
