//! Ready-made event sinks.

use tokio::sync::mpsc;

use super::{EventSink, HubEvent, Message};
use crate::error::HubError;
use crate::net::Endpoint;

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {}

/// Forwards every event as a [`HubEvent`] over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<HubEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HubEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: HubEvent) {
        // A dropped receiver means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

impl EventSink for ChannelEventSink {
    fn client_connected(&self, endpoint: Endpoint) {
        self.forward(HubEvent::Connected(endpoint));
    }

    fn client_rejected(&self, endpoint: Endpoint) {
        self.forward(HubEvent::Rejected(endpoint));
    }

    fn client_accepted(&self, endpoint: Endpoint) {
        self.forward(HubEvent::Accepted(endpoint));
    }

    fn client_disconnected(&self, endpoint: Endpoint) {
        self.forward(HubEvent::Disconnected(endpoint));
    }

    fn message_received(&self, message: Message) {
        self.forward(HubEvent::MessageReceived(message));
    }

    fn connection_fault(&self, endpoint: Option<Endpoint>, error: &HubError) {
        self.forward(HubEvent::Fault {
            endpoint,
            error: error.to_string(),
        });
    }
}

/// Logs every event. Used by the `tcp-hub` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn client_connected(&self, endpoint: Endpoint) {
        tracing::debug!(endpoint = %endpoint, "Client connected");
    }

    fn client_rejected(&self, endpoint: Endpoint) {
        tracing::warn!(endpoint = %endpoint, "Client rejected: hub is full");
    }

    fn client_accepted(&self, endpoint: Endpoint) {
        tracing::info!(endpoint = %endpoint, "Client accepted");
    }

    fn client_disconnected(&self, endpoint: Endpoint) {
        tracing::info!(endpoint = %endpoint, "Client disconnected");
    }

    fn message_received(&self, message: Message) {
        tracing::info!(
            endpoint = %message.sender,
            bytes = message.payload.len(),
            "Message received"
        );
    }

    fn connection_fault(&self, endpoint: Option<Endpoint>, error: &HubError) {
        match endpoint {
            Some(endpoint) => tracing::warn!(endpoint = %endpoint, error = %error, "Connection fault"),
            None => tracing::warn!(error = %error, "Connection fault"),
        }
    }
}
