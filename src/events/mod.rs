//! Event surface exposed to the embedding application.
//!
//! # Events
//! ```text
//! accept loop:  client_connected → client_rejected
//!                                → client_accepted
//! supervisor:   message_received*  → client_disconnected
//! any stage:    connection_fault (per-connection processing errors)
//! ```
//!
//! # Design Decisions
//! - Events are fire-and-forget; the hub never reads anything back
//! - For one session, `client_accepted` precedes its messages, and nothing
//!   follows `client_disconnected`
//! - A panicking sink is contained by the hub and logged

pub mod sinks;

use bytes::Bytes;

use crate::error::HubError;
use crate::net::Endpoint;

pub use sinks::{ChannelEventSink, NullEventSink, TracingEventSink};

/// A fully decoded application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Remote peer the message came from.
    pub sender: Endpoint,
    /// Payload after every transform stage has been undone.
    pub payload: Bytes,
}

impl Message {
    pub fn new(sender: Endpoint, payload: impl Into<Bytes>) -> Self {
        Self {
            sender,
            payload: payload.into(),
        }
    }
}

/// Receiver of hub lifecycle and data events.
///
/// Every method defaults to a no-op so sinks only implement what they need.
/// Methods are called from the accept task and the supervisor task and must
/// not block for long.
pub trait EventSink: Send + Sync {
    /// A socket was accepted, before admission is decided.
    fn client_connected(&self, _endpoint: Endpoint) {}

    /// The hub was full; the socket has been closed.
    fn client_rejected(&self, _endpoint: Endpoint) {}

    /// The connection was admitted and its session registered.
    fn client_accepted(&self, _endpoint: Endpoint) {}

    /// The session was torn down.
    fn client_disconnected(&self, _endpoint: Endpoint) {}

    /// A message was decoded.
    fn message_received(&self, _message: Message) {}

    /// Processing a single connection failed. The hub keeps running.
    fn connection_fault(&self, _endpoint: Option<Endpoint>, _error: &HubError) {}
}

/// Owned form of every event, for channel-based consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    Connected(Endpoint),
    Rejected(Endpoint),
    Accepted(Endpoint),
    Disconnected(Endpoint),
    MessageReceived(Message),
    Fault {
        endpoint: Option<Endpoint>,
        error: String,
    },
}
