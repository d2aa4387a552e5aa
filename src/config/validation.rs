//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (frame length, compression level, timeouts)
//! - Validate addresses parse before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HubConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::capability::ZlibCompression;
use crate::config::schema::HubConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("dispatcher.max_frame_length must be between 1 and {max}", max = u32::MAX)]
    FrameLength,

    #[error("dispatcher.idle_timeout_secs must be greater than 0 when set")]
    IdleTimeout,

    #[error("dispatcher.signal_capacity must be greater than 0")]
    SignalCapacity,

    #[error("monitor.probe_timeout_ms must be greater than 0 when probing is enabled")]
    ProbeTimeout,

    #[error("compression.level {0} is out of range 0..=9")]
    CompressionLevel(u32),

    #[error("compression.max_decompressed_len must be greater than 0")]
    DecompressedLength,

    #[error("accept.error_backoff_base_ms must not exceed accept.error_backoff_max_ms")]
    Backoff,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check a parsed configuration, collecting every violation.
pub fn validate_config(config: &HubConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let frame_len = config.dispatcher.max_frame_length;
    if frame_len == 0 || frame_len as u64 > u64::from(u32::MAX) {
        errors.push(ValidationError::FrameLength);
    }
    if config.dispatcher.idle_timeout_secs == Some(0) {
        errors.push(ValidationError::IdleTimeout);
    }
    if config.dispatcher.signal_capacity == 0 {
        errors.push(ValidationError::SignalCapacity);
    }

    if config.monitor.probe_interval_ms > 0 && config.monitor.probe_timeout_ms == 0 {
        errors.push(ValidationError::ProbeTimeout);
    }

    if config.compression.level > ZlibCompression::MAX_LEVEL {
        errors.push(ValidationError::CompressionLevel(config.compression.level));
    }
    if config.compression.max_decompressed_len == 0 {
        errors.push(ValidationError::DecompressedLength);
    }

    if config.accept.error_backoff_base_ms > config.accept.error_backoff_max_ms {
        errors.push(ValidationError::Backoff);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&HubConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_violation() {
        let mut config = HubConfig::default();
        config.listener.bind_address = "localhost".into();
        config.dispatcher.max_frame_length = 0;
        config.compression.level = 12;
        config.accept.error_backoff_base_ms = 5_000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BindAddress("localhost".into()),
                ValidationError::FrameLength,
                ValidationError::CompressionLevel(12),
                ValidationError::Backoff,
            ]
        );
    }

    #[test]
    fn probe_timeout_only_matters_when_probing() {
        let mut config = HubConfig::default();
        config.monitor.probe_timeout_ms = 0;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::ProbeTimeout])
        );

        config.monitor.probe_interval_ms = 0;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = HubConfig::default();
        config.observability.metrics_address = "nope".into();
        assert_eq!(validate_config(&config), Ok(()));

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::MetricsAddress("nope".into())])
        );
    }
}
