//! `tcp-hub` binary: runs a hub server from a TOML config file.
//!
//! ```text
//! tcp-hub --config hub.toml [--bind 0.0.0.0:7400] [--allowed-connections N]
//! ```
//!
//! Ctrl+C or SIGTERM stops accepting and disconnects every client. Edits to
//! `[hub].allowed_connections` in the config file apply without a restart.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use tcp_hub::capability::PlaintextCipher;
use tcp_hub::config::validation::validate_config;
use tcp_hub::config::watcher::ConfigWatcher;
use tcp_hub::config::{load_config, ConfigError, HubConfig};
use tcp_hub::events::TracingEventSink;
use tcp_hub::lifecycle::{spawn_signal_listener, Shutdown};
use tcp_hub::observability::{logging, metrics};
use tcp_hub::HubServer;

#[derive(Parser)]
#[command(name = "tcp-hub")]
#[command(about = "TCP hub server with admission control and liveness monitoring", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `[listener].bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `[hub].allowed_connections`.
    #[arg(short, long)]
    allowed_connections: Option<usize>,
}

impl Cli {
    fn load(&self) -> Result<HubConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => HubConfig::default(),
        };
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(allowed) = self.allowed_connections {
            config.hub.allowed_connections = allowed;
        }
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    logging::init(&config.observability)?;
    tracing::info!("tcp-hub v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        allowed_connections = config.hub.allowed_connections,
        probe_interval_ms = config.monitor.probe_interval_ms,
        compression = config.compression.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    tracing::warn!("No cipher configured for the binary, frames are carried in plaintext");
    let server = Arc::new(HubServer::from_config(
        &config,
        Arc::new(PlaintextCipher),
        Arc::new(TracingEventSink),
    )?);
    server.start().await?;

    // Keep the watcher alive for the lifetime of the process.
    let _watcher = match &cli.config {
        Some(path) => {
            let (watcher, mut options) = ConfigWatcher::new(path, config.hub);
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                while options.changed().await.is_ok() {
                    let allowed = options.borrow_and_update().allowed_connections;
                    server.set_allowed_connections(allowed);
                }
            });
            match watcher.run() {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload disabled");
                    None
                }
            }
        }
        None => None,
    };

    let shutdown = Shutdown::new();
    spawn_signal_listener(&shutdown);
    shutdown.wait().await;

    server.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
