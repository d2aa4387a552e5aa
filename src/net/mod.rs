//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, per-socket options)
//!     → endpoint.rs (remote address becomes the session key)
//!     → Hand off to the hub's admission control
//! ```
//!
//! # Design Decisions
//! - The listener never blocks on capacity; admission is a hub decision
//! - Endpoints compare by value so address reuse is detectable

pub mod endpoint;
pub mod listener;

pub use endpoint::Endpoint;
