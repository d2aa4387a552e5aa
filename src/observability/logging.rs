//! Structured logging.
//!
//! # Responsibilities
//! - Select and install a logging backend at startup
//! - Resolve the log level from `RUST_LOG` or configuration
//!
//! # Design Decisions
//! - The library only emits `tracing` events; with no subscriber installed
//!   they cost nothing, so an embedder that never calls `init` gets silent
//!   logging without any null-object plumbing
//! - `console` is compact and goes to stdout, `trace` is verbose diagnostic
//!   output on stderr with span timings

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Available logging backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogBackend {
    /// Compact human-readable lines on stdout.
    #[default]
    Console,
    /// Verbose diagnostic output on stderr (targets, thread ids, span close events).
    Trace,
    /// No subscriber; all events are discarded.
    None,
}

/// Errors from logging initialization.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter {filter:?}: {reason}")]
    Filter { filter: String, reason: String },

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Install the configured backend as the global subscriber.
pub fn init(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    if config.log_backend == LogBackend::None {
        return Ok(());
    }

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| LoggingError::Filter {
            filter: config.log_level.clone(),
            reason: e.to_string(),
        })?,
    };

    let installed = match config.log_backend {
        LogBackend::Console => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        LogBackend::Trace => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
        LogBackend::None => Ok(()),
    };

    installed.map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_backend_installs_nothing() {
        let config = ObservabilityConfig {
            log_backend: LogBackend::None,
            log_level: "this is not a filter [".into(),
            ..ObservabilityConfig::default()
        };
        assert!(init(&config).is_ok());
    }
}
