//! Built-in encryption capabilities.

use super::{CapabilityError, Encryption};

/// Identity cipher.
///
/// The hub refuses to start without an encryption capability. Deployments
/// that terminate TLS elsewhere (or run on a trusted network) pass this
/// explicitly so the choice shows up in code and in the startup log.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextCipher;

impl Encryption for PlaintextCipher {
    fn name(&self) -> &'static str {
        "plaintext"
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        Ok(ciphertext.to_vec())
    }
}
