//! Tile Gateway Server
//!
//! Loads configuration, sets up logging, opens the object store and serves
//! the public gateway (plus the optional operational endpoint).

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tilegate::{
    FsObjectStore, GateConfig, GateServer, InMemoryObjectStore, MetricsEndpoint, Negotiator,
    ObjectStore, StoreBackend,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entry point for the tile gateway
///
/// # Usage
/// ```bash
/// # Start with default config (tilegate.yaml)
/// tilegate
///
/// # Start with custom config
/// tilegate /path/to/config.yaml
/// ```
///
/// Log verbosity follows `RUST_LOG` and defaults to `info`.
#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    info!("Starting Tile Gateway");

    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "tilegate.yaml".to_string());

    info!("Loading configuration from: {}", config_path);

    let config = match GateConfig::from_file(&config_path) {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            info!("  - Listen address: {}", cfg.listen_address);
            info!("  - Maps root: {}", cfg.maps_root);
            info!("  - Entry document: {}", cfg.entry_document);
            info!("  - Cache max-age: {} seconds", cfg.cache_max_age);
            info!("  - Store backend: {:?}", cfg.store.backend);
            match &cfg.live_origin {
                Some(origin) => info!(
                    "  - Live origin: {} (max-age {} seconds)",
                    origin, cfg.live_cache_max_age
                ),
                None => info!("  - Live origin: disabled"),
            }
            cfg
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("Please ensure the configuration file exists and is valid");
            std::process::exit(1);
        }
    };

    let listen_addr: SocketAddr = config
        .listen_address
        .parse()
        .with_context(|| format!("invalid listen_address: {}", config.listen_address))?;

    let store = open_store(&config)?;
    let config = Arc::new(config);
    let negotiator = Negotiator::new(Arc::clone(&config), store)
        .context("failed to initialize negotiator")?;

    if let Some(endpoint) = config.metrics_endpoint.as_ref().filter(|e| e.enabled) {
        let addr: SocketAddr = endpoint
            .address
            .parse()
            .with_context(|| format!("invalid metrics address: {}", endpoint.address))?;
        let metrics_endpoint = MetricsEndpoint::new(negotiator.clone(), addr);
        tokio::spawn(async move {
            if let Err(e) = metrics_endpoint.start().await {
                warn!("Metrics endpoint stopped: {}", e);
            }
        });
    }

    let server = GateServer::new(negotiator, listen_addr);
    if let Err(e) = server.start().await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize the tracing subscriber from `RUST_LOG`, defaulting to `info`
fn init_tracing() -> Result<()> {
    let filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new("info").context("invalid default log filter")?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    Ok(())
}

/// Open the configured object store backend
fn open_store(config: &GateConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            warn!("Using the in-memory store; it starts empty");
            Ok(Arc::new(InMemoryObjectStore::new()))
        }
        StoreBackend::Filesystem => {
            let root = config
                .store
                .root
                .as_deref()
                .context("store.root is required for the filesystem backend")?;
            info!("Serving objects from directory: {}", root);
            Ok(Arc::new(FsObjectStore::new(root)))
        }
    }
}
