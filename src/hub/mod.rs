//! Hub subsystem: the server that owns the listener and every session.
//!
//! # Data Flow
//! ```text
//! accept task (per listening period):
//!     accept → client_connected
//!            → admission.rs try_admit ──full──▶ client_rejected, close
//!            → build monitor + dispatcher → registry try_add
//!                  ──conflict──▶ release slot, drop new socket
//!            → client_accepted → start workers
//!
//! supervisor task (per server):
//!     SessionSignal::Message        → message_received (current session only)
//!     SessionSignal::StatusChanged  → Closed ─┐
//!     SessionSignal::DispatchFailed ──────────┼─▶ teardown
//! disconnect()/disconnect_all() ──────────────┘
//!
//! teardown: registry remove → cancel workers → release slot
//!           → client_disconnected
//! ```
//!
//! # Design Decisions
//! - Registry removal is the single gate for teardown; losing the race is a
//!   no-op, so every trigger may fire freely
//! - A fault while handling one socket is reported and the loop carries on
//! - Accept errors back off exponentially so descriptor exhaustion cannot spin
//!   the loop

pub mod admission;
pub mod builder;
pub mod server;

pub use admission::AdmissionController;
pub use builder::HubServerBuilder;
pub use server::HubServer;
