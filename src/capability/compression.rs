//! Zlib compression capability.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use super::{CapabilityError, Compression};
use crate::config::CompressionConfig;

/// Zlib (RFC 1950) compression backed by `flate2`.
///
/// Decompression stops at `max_decompressed_len` so a small hostile frame
/// cannot inflate into an unbounded allocation.
#[derive(Debug, Clone)]
pub struct ZlibCompression {
    level: u32,
    max_decompressed_len: usize,
}

impl ZlibCompression {
    /// Highest zlib compression level.
    pub const MAX_LEVEL: u32 = 9;

    /// Create a compressor with the given level (0-9) and output cap.
    pub fn new(level: u32, max_decompressed_len: usize) -> Result<Self, CapabilityError> {
        if level > Self::MAX_LEVEL {
            return Err(CapabilityError::Config(format!(
                "zlib level {} is out of range 0..={}",
                level,
                Self::MAX_LEVEL
            )));
        }
        Ok(Self {
            level,
            max_decompressed_len,
        })
    }

    /// Build from the `[compression]` config section.
    pub fn from_config(config: &CompressionConfig) -> Result<Self, CapabilityError> {
        Self::new(config.level, config.max_decompressed_len)
    }
}

impl Compression for ZlibCompression {
    fn name(&self) -> &'static str {
        "zlib"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| CapabilityError::Compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| CapabilityError::Compression(e.to_string()))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        let limit = self.max_decompressed_len;
        let mut out = Vec::new();
        // Read one byte past the cap to tell "exactly at limit" from "over".
        ZlibDecoder::new(data)
            .take(limit as u64 + 1)
            .read_to_end(&mut out)
            .map_err(|e| CapabilityError::Compression(e.to_string()))?;

        if out.len() > limit {
            return Err(CapabilityError::TooLarge { limit });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_then_decompress_restores_input() {
        let zlib = ZlibCompression::new(6, 1024).unwrap();
        let data = b"hub hub hub hub hub hub hub hub".repeat(4);

        let packed = zlib.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(zlib.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn rejects_garbage() {
        let zlib = ZlibCompression::new(6, 1024).unwrap();
        assert!(matches!(
            zlib.decompress(b"definitely not zlib"),
            Err(CapabilityError::Compression(_))
        ));
    }

    #[test]
    fn enforces_decompressed_size_cap() {
        let zlib = ZlibCompression::new(9, 64).unwrap();
        let bomb = zlib.compress(&[0u8; 4096]).unwrap();

        assert!(matches!(
            zlib.decompress(&bomb),
            Err(CapabilityError::TooLarge { limit: 64 })
        ));
    }

    #[test]
    fn level_out_of_range() {
        assert!(ZlibCompression::new(10, 1024).is_err());
    }
}
