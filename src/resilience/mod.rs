//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! accept() fails
//!     → backoff.rs (exponential delay with jitter, reset on next success)
//!     → accept loop sleeps, still honouring cancellation
//! ```

pub mod backoff;
