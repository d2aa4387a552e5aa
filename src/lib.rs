//! TCP hub server.
//!
//! Accepts many long-lived client connections, admits them up to a
//! configurable ceiling, watches each one for liveness, decodes its
//! length-prefixed frames through encryption and optional compression, and
//! reports lifecycle and message events to the embedding application.
//!
//! ```text
//!  clients ──TCP──▶ hub::server (accept loop)
//!                      │ admission · registry
//!                      ▼
//!                  session (per connection)
//!                      ├─ monitor     (write half, heartbeats, state)
//!                      └─ dispatcher  (read half, frames → Message)
//!                      │ SessionSignal
//!                      ▼
//!                  hub::server (supervisor) ──▶ events::EventSink
//! ```

pub mod capability;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod hub;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod session;

pub use capability::{Compression, Encryption};
pub use config::schema::HubConfig;
pub use error::HubError;
pub use events::{EventSink, HubEvent, Message};
pub use hub::{HubServer, HubServerBuilder};
pub use lifecycle::Shutdown;
pub use net::Endpoint;
