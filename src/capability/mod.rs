//! Pluggable transform capabilities.
//!
//! # Data Flow
//! ```text
//! Sender side (TransformChain::encode):
//!     payload → compress → encrypt → frame
//!
//! Dispatcher side (TransformChain::decode):
//!     frame → decrypt → decompress → Message.payload
//! ```
//!
//! # Design Decisions
//! - Encryption is mandatory; operators who want cleartext must say so with
//!   `PlaintextCipher`
//! - Compression is optional; absence is the identity transform
//! - Capabilities are shared trait objects, consumed the same way by every
//!   dispatcher

pub mod compression;
pub mod encryption;

use thiserror::Error;

pub use compression::ZlibCompression;
pub use encryption::PlaintextCipher;

/// Errors raised by a transform stage.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// Encrypting or decrypting a frame failed.
    #[error("encryption stage failed: {0}")]
    Encryption(String),

    /// Compressing or decompressing a frame failed.
    #[error("compression stage failed: {0}")]
    Compression(String),

    /// A decoded frame grew past the configured limit.
    #[error("decoded frame exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// The capability was configured with invalid parameters.
    #[error("invalid capability configuration: {0}")]
    Config(String),
}

/// Frame-level encryption.
///
/// Implementations must be deterministic inverses: `decrypt(encrypt(x)) == x`.
pub trait Encryption: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Encrypt a plaintext frame.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CapabilityError>;

    /// Decrypt a ciphertext frame. Tampered or truncated input must fail.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CapabilityError>;
}

/// Frame-level compression.
pub trait Compression: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Compress a frame.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CapabilityError>;

    /// Decompress a frame.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CapabilityError>;
}
