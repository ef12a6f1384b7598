//! The shared secret guarding mutating requests.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use std::fmt;

/// Single credential shared by every client allowed to mutate uploads.
///
/// Only the SHA-256 digest of the decoded secret is retained.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret {
    digest: [u8; 32],
}

impl SharedSecret {
    /// Decode a base64-encoded secret as found in configuration.
    pub fn from_base64(encoded: &str) -> crate::Result<Self> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(crate::Error::InvalidSecret("secret is empty".to_string()));
        }
        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| crate::Error::InvalidSecret(format!("not valid base64: {e}")))?;
        if raw.is_empty() {
            return Err(crate::Error::InvalidSecret(
                "secret decodes to zero bytes".to_string(),
            ));
        }
        Ok(Self::from_bytes(&raw))
    }

    /// Build from the raw secret bytes.
    pub fn from_bytes(raw: &[u8]) -> Self {
        Self {
            digest: Sha256::digest(raw).into(),
        }
    }

    /// Check a presented password against the secret.
    pub fn verify(&self, presented: &[u8]) -> bool {
        let presented: [u8; 32] = Sha256::digest(presented).into();
        // No early exit on mismatch.
        presented
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}
