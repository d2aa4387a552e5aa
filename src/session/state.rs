//! Connection state machine.
//!
//! # States
//! ```text
//! Connecting → Open → Closing → Closed
//!     │                           ▲
//!     └───────────────────────────┘  (cancelled before start)
//! ```
//! `Closed` is terminal.

use std::fmt;

/// Liveness state of one connection, as seen by its monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Registered, monitor not yet running.
    Connecting,
    /// Monitor running, peer believed alive.
    Open,
    /// Shutting the socket down.
    Closing,
    /// Terminal; teardown has been requested.
    Closed,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Closed
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Open)
                | (Connecting, Closing)
                | (Connecting, Closed)
                | (Open, Closing)
                | (Open, Closed)
                | (Closing, Closed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
