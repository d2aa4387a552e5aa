//! Notifications sent from session workers to the hub.

use tokio::sync::mpsc;

use super::dispatcher::DispatchError;
use super::state::ConnectionState;
use super::SessionId;
use crate::events::Message;
use crate::net::Endpoint;

/// Something a monitor or dispatcher wants the hub to know.
#[derive(Debug)]
pub enum SessionSignal {
    /// The monitor moved to a new state.
    StatusChanged {
        endpoint: Endpoint,
        session: SessionId,
        state: ConnectionState,
    },
    /// The dispatcher decoded a message.
    Message { session: SessionId, message: Message },
    /// The dispatcher stopped because the connection failed.
    DispatchFailed {
        endpoint: Endpoint,
        session: SessionId,
        error: DispatchError,
    },
}

pub type SignalSender = mpsc::Sender<SessionSignal>;
pub type SignalReceiver = mpsc::Receiver<SessionSignal>;

/// Create the bounded channel workers report on.
pub fn channel(capacity: usize) -> (SignalSender, SignalReceiver) {
    mpsc::channel(capacity.max(1))
}
