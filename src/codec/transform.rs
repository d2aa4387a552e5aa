//! Ordered transform chain applied to frame payloads.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::{CapabilityError, Compression, Encryption};

/// Order in which a sender applies the transforms.
///
/// The dispatcher always undoes them in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformOrder {
    /// Sender compresses, then encrypts. Dispatcher decrypts, then decompresses.
    #[default]
    CompressThenEncrypt,
    /// Sender encrypts, then compresses. Dispatcher decompresses, then decrypts.
    EncryptThenCompress,
}

/// The encryption stage plus an optional compression stage.
#[derive(Clone)]
pub struct TransformChain {
    encryption: Arc<dyn Encryption>,
    compression: Option<Arc<dyn Compression>>,
    order: TransformOrder,
}

impl TransformChain {
    pub fn new(
        encryption: Arc<dyn Encryption>,
        compression: Option<Arc<dyn Compression>>,
        order: TransformOrder,
    ) -> Self {
        Self {
            encryption,
            compression,
            order,
        }
    }

    pub fn order(&self) -> TransformOrder {
        self.order
    }

    /// Sender side: turn an application payload into a frame body.
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        match self.order {
            TransformOrder::CompressThenEncrypt => {
                let packed = self.compress(payload)?;
                self.encryption.encrypt(&packed)
            }
            TransformOrder::EncryptThenCompress => {
                let sealed = self.encryption.encrypt(payload)?;
                self.compress(&sealed)
            }
        }
    }

    /// Dispatcher side: turn a frame body back into the application payload.
    pub fn decode(&self, frame: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        match self.order {
            TransformOrder::CompressThenEncrypt => {
                let packed = self.encryption.decrypt(frame)?;
                self.decompress(&packed)
            }
            TransformOrder::EncryptThenCompress => {
                let sealed = self.decompress(frame)?;
                self.encryption.decrypt(&sealed)
            }
        }
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        match &self.compression {
            Some(compression) => compression.compress(data),
            None => Ok(data.to_vec()),
        }
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        match &self.compression {
            Some(compression) => compression.decompress(data),
            None => Ok(data.to_vec()),
        }
    }
}

impl fmt::Debug for TransformChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformChain")
            .field("encryption", &self.encryption.name())
            .field("compression", &self.compression.as_ref().map(|c| c.name()))
            .field("order", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ZlibCompression;

    /// Adds a one-byte tag so decrypting the wrong input fails.
    struct TaggedCipher;

    impl Encryption for TaggedCipher {
        fn name(&self) -> &'static str {
            "tagged"
        }

        fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CapabilityError> {
            let mut out = vec![0xA5];
            out.extend(plaintext.iter().map(|b| b ^ 0x5A));
            Ok(out)
        }

        fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CapabilityError> {
            match ciphertext.split_first() {
                Some((0xA5, body)) => Ok(body.iter().map(|b| b ^ 0x5A).collect()),
                _ => Err(CapabilityError::Encryption("bad tag".into())),
            }
        }
    }

    fn zlib() -> Arc<dyn Compression> {
        Arc::new(ZlibCompression::new(6, 1 << 20).unwrap())
    }

    #[test]
    fn round_trip_in_both_orders() {
        let payload = b"the quick brown fox jumps over the lazy dog".repeat(8);

        for order in [
            TransformOrder::CompressThenEncrypt,
            TransformOrder::EncryptThenCompress,
        ] {
            let chain = TransformChain::new(Arc::new(TaggedCipher), Some(zlib()), order);
            let frame = chain.encode(&payload).unwrap();
            assert_ne!(frame, payload);
            assert_eq!(chain.decode(&frame).unwrap(), payload, "order {:?}", order);
        }
    }

    #[test]
    fn missing_compression_is_identity() {
        let chain = TransformChain::new(
            Arc::new(TaggedCipher),
            None,
            TransformOrder::CompressThenEncrypt,
        );
        let frame = chain.encode(b"abc").unwrap();
        assert_eq!(frame, vec![0xA5, b'a' ^ 0x5A, b'b' ^ 0x5A, b'c' ^ 0x5A]);
        assert_eq!(chain.decode(&frame).unwrap(), b"abc");
    }

    #[test]
    fn mismatched_order_fails_to_decode() {
        let sender = TransformChain::new(
            Arc::new(TaggedCipher),
            Some(zlib()),
            TransformOrder::EncryptThenCompress,
        );
        let receiver = TransformChain::new(
            Arc::new(TaggedCipher),
            Some(zlib()),
            TransformOrder::CompressThenEncrypt,
        );

        let frame = sender.encode(b"payload").unwrap();
        assert!(receiver.decode(&frame).is_err());
    }
}
