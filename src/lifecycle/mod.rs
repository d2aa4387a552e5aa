//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init logging/metrics → Build hub → start()
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → disconnect every session → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - Config reload comes from the file watcher, not SIGHUP
//! - Shutdown is triggered once; repeated signals are ignored

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{spawn_signal_listener, wait_for_signal};
