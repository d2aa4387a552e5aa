//! Framing and payload transforms.
//!
//! # Data Flow
//! ```text
//! socket bytes
//!     → frame.rs (length-delimited frames, kind tag, heartbeats skipped)
//!     → transform.rs (decrypt / decompress in configured order)
//!     → Message payload
//! ```

pub mod frame;
pub mod transform;

pub use frame::{data_frame, frame_codec, heartbeat, DEFAULT_MAX_FRAME_LENGTH};
pub use transform::{TransformChain, TransformOrder};
