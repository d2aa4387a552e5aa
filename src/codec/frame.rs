//! Wire framing.
//!
//! Every frame is a 4-byte big-endian length followed by that many bytes.
//! A zero-length frame carries no message and is used as a heartbeat in both
//! directions. Every other frame starts with a one-byte kind tag, so a message
//! whose encoded body is empty still travels as a non-empty frame.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;
use tokio_util::codec::LengthDelimitedCodec;

/// Default upper bound on a single frame's payload (8 MiB).
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;

/// Kind tag of a frame carrying a message body.
pub const DATA_TAG: u8 = 0x01;

/// A frame whose kind tag is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown frame kind 0x{0:02x}")]
pub struct UnknownFrameKind(pub u8);

/// A received frame, split by kind.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame<'a> {
    Heartbeat,
    Data(&'a [u8]),
}

/// Build the length-delimited codec used by dispatchers and monitors.
pub fn frame_codec(max_frame_length: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .max_frame_length(max_frame_length)
        .new_codec()
}

/// The empty heartbeat frame.
pub fn heartbeat() -> Bytes {
    Bytes::new()
}

/// Wrap an encoded message body in a data frame.
pub fn data_frame(body: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(body.len() + 1);
    frame.put_u8(DATA_TAG);
    frame.put_slice(body);
    frame.freeze()
}

/// Classify a received frame.
pub fn parse_frame(frame: &[u8]) -> Result<Frame<'_>, UnknownFrameKind> {
    match frame.split_first() {
        None => Ok(Frame::Heartbeat),
        Some((&DATA_TAG, body)) => Ok(Frame::Data(body)),
        Some((&tag, _)) => Err(UnknownFrameKind(tag)),
    }
}
