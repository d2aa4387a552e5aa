//! Session subsystem: the per-connection workers and their registry.
//!
//! # Data Flow
//! ```text
//! accepted TcpStream
//!     → into_split()
//!         write half → monitor.rs (heartbeat probes, state machine)
//!         read half  → dispatcher.rs (frames → transform chain → Message)
//!     → both report SessionSignal (signal.rs) to the hub supervisor
//!     → registry.rs holds one Session per endpoint until teardown
//! ```
//!
//! # Design Decisions
//! - Workers never call back into the hub; they only send signals
//! - A session is identified by endpoint *and* id, so stale signals from a
//!   replaced session are recognisable
//! - Either worker failing ends both; the hub cancels the survivor

pub mod dispatcher;
pub mod monitor;
pub mod registry;
pub mod signal;
pub mod state;

use std::fmt;

use uuid::Uuid;

pub use dispatcher::{DispatchError, DispatcherHandle, MessageDispatcher};
pub use monitor::{ConnectionMonitor, MonitorHandle};
pub use registry::ConnectionRegistry;
pub use signal::SessionSignal;
pub use state::ConnectionState;

/// Unique id of one admitted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Registry entry: the handles needed to stop one connection's workers.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    monitor: MonitorHandle,
    dispatcher: DispatcherHandle,
}

impl Session {
    pub fn new(id: SessionId, monitor: MonitorHandle, dispatcher: DispatcherHandle) -> Self {
        Self {
            id,
            monitor,
            dispatcher,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn monitor(&self) -> &MonitorHandle {
        &self.monitor
    }

    pub fn dispatcher(&self) -> &DispatcherHandle {
        &self.dispatcher
    }

    /// Stop both workers. Idempotent.
    pub fn cancel(&self) {
        self.monitor.cancel();
        self.dispatcher.cancel();
    }

    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self::new(
            SessionId::new(),
            MonitorHandle::detached(),
            DispatcherHandle::detached(),
        )
    }
}
