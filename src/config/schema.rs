//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the hub.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::{TransformOrder, DEFAULT_MAX_FRAME_LENGTH};
use crate::observability::logging::LogBackend;

/// Root configuration for the hub server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HubConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Admission options.
    pub hub: HubOptions,

    /// Per-connection liveness monitor settings.
    pub monitor: MonitorConfig,

    /// Per-connection message dispatcher settings.
    pub dispatcher: DispatcherConfig,

    /// Optional compression stage.
    pub compression: CompressionConfig,

    /// Accept loop error handling.
    pub accept: AcceptConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:7400").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7400".to_string(),
        }
    }
}

/// Admission options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HubOptions {
    /// Maximum number of simultaneously admitted connections.
    pub allowed_connections: usize,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            allowed_connections: 1024,
        }
    }
}

/// Liveness monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Interval between heartbeat probes in milliseconds. 0 disables probing.
    pub probe_interval_ms: u64,

    /// How long a single probe write may take before the peer is declared gone.
    pub probe_timeout_ms: u64,
}

impl MonitorConfig {
    pub fn probe_interval(&self) -> Option<Duration> {
        (self.probe_interval_ms > 0).then(|| Duration::from_millis(self.probe_interval_ms))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: 5_000,
            probe_timeout_ms: 2_000,
        }
    }
}

/// Message dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Largest accepted frame payload in bytes.
    pub max_frame_length: usize,

    /// Close the connection if no frame (heartbeats included) arrives within
    /// this many seconds. Unset waits forever.
    pub idle_timeout_secs: Option<u64>,

    /// Order the sender applied compression and encryption in.
    pub transform_order: TransformOrder,

    /// Capacity of the channel carrying worker notifications to the hub.
    pub signal_capacity: usize,
}

impl DispatcherConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            idle_timeout_secs: None,
            transform_order: TransformOrder::default(),
            signal_capacity: 1024,
        }
    }
}

/// Compression stage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Enable the zlib stage.
    pub enabled: bool,

    /// Zlib level, 0-9.
    pub level: u32,

    /// Upper bound on a decompressed payload in bytes.
    pub max_decompressed_len: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: 6,
            max_decompressed_len: 16 * 1024 * 1024,
        }
    }
}

/// Accept loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AcceptConfig {
    /// Base delay after a failed `accept` in milliseconds.
    pub error_backoff_base_ms: u64,

    /// Maximum delay after repeated `accept` failures in milliseconds.
    pub error_backoff_max_ms: u64,
}

impl Default for AcceptConfig {
    fn default() -> Self {
        Self {
            error_backoff_base_ms: 10,
            error_backoff_max_ms: 1_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Log backend: console, trace or none.
    pub log_backend: LogBackend,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_backend: LogBackend::Console,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9400".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config: HubConfig = toml::from_str(
            r#"
            [hub]
            allowed_connections = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.hub.allowed_connections, 2);
        assert_eq!(config.listener.bind_address, "0.0.0.0:7400");
        assert_eq!(config.dispatcher.max_frame_length, DEFAULT_MAX_FRAME_LENGTH);
        assert!(config.compression.enabled);
    }

    #[test]
    fn parses_enums_and_optional_timeouts() {
        let config: HubConfig = toml::from_str(
            r#"
            [dispatcher]
            transform_order = "encrypt_then_compress"
            idle_timeout_secs = 30

            [monitor]
            probe_interval_ms = 0

            [observability]
            log_backend = "none"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.dispatcher.transform_order,
            TransformOrder::EncryptThenCompress
        );
        assert_eq!(config.dispatcher.idle_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.monitor.probe_interval(), None);
        assert_eq!(config.observability.log_backend, LogBackend::None);
    }
}
