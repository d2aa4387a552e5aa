//! TCP listener setup.
//!
//! # Responsibilities
//! - Resolve and bind the configured address
//! - Prepare accepted sockets for framed traffic
//!
//! Admission (the connection ceiling) is not enforced here: a full hub still
//! accepts the socket so it can report the rejection and close it.

use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

use crate::error::HubError;

/// Bind a listener to `bind_address` (e.g. `"0.0.0.0:7400"`).
pub async fn bind(bind_address: &str) -> Result<TcpListener, HubError> {
    let addr: SocketAddr = bind_address
        .parse()
        .map_err(|_| HubError::InvalidAddress(bind_address.to_string()))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| HubError::Bind { address: addr, source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| HubError::Bind { address: addr, source })?;

    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}

/// Apply per-socket options to an accepted stream.
pub fn configure_stream(stream: &TcpStream) -> Result<(), HubError> {
    // Heartbeats and small messages should not wait on Nagle.
    stream.set_nodelay(true).map_err(HubError::Socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_rejects_unparseable_address() {
        let err = bind("not-an-address").await.unwrap_err();
        assert!(matches!(err, HubError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn bind_ephemeral_port() {
        let listener = bind("127.0.0.1:0").await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}
