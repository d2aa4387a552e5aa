//! Server-level error types.

use std::net::SocketAddr;
use thiserror::Error;

use crate::capability::CapabilityError;

/// Errors raised by the hub server.
///
/// Only [`HubError::MissingEncryption`] and the start/bind variants reach the
/// caller of the public API. The rest describe per-connection faults, which the
/// accept loop reports through the event sink and then moves on.
#[derive(Debug, Error)]
pub enum HubError {
    /// The server was built without an encryption capability.
    #[error("an encryption capability is required to build the hub server")]
    MissingEncryption,

    /// The configured bind address could not be parsed.
    #[error("invalid bind address: {0}")]
    InvalidAddress(String),

    /// Binding the listener failed.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// `start` was called while the server was already listening.
    #[error("hub server is already listening on {0}")]
    AlreadyRunning(SocketAddr),

    /// Accepting a connection failed.
    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    /// Configuring an accepted socket failed.
    #[error("failed to configure socket: {0}")]
    Socket(#[source] std::io::Error),

    /// Processing an accepted connection panicked.
    #[error("connection handler panicked: {0}")]
    Panicked(String),

    /// A capability could not be constructed.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

impl HubError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            HubError::MissingEncryption => "missing_encryption",
            HubError::InvalidAddress(_) => "invalid_address",
            HubError::Bind { .. } => "bind",
            HubError::AlreadyRunning(_) => "already_running",
            HubError::Accept(_) => "accept",
            HubError::Socket(_) => "socket",
            HubError::Panicked(_) => "panic",
            HubError::Capability(_) => "capability",
        }
    }
}
