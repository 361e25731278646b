//! HMAC-SHA256 signatures over short messages.

use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Signing errors.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Failed to create HMAC: {0}")]
    InvalidKey(String),
}

/// Computes and checks lower-case hex HMAC-SHA256 digests with one secret.
#[derive(Clone)]
pub struct Signer {
    secret: Vec<u8>,
}

impl Signer {
    /// Create a signer for the given shared secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Sign a message, returning the lower-case hex digest.
    pub fn sign(&self, message: &[u8]) -> Result<String, SigningError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        mac.update(message);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a provided hex signature against the message.
    ///
    /// A wrong signature is not an error, it simply fails verification.
    pub fn verify(&self, message: &[u8], provided_hex: &str) -> bool {
        let expected = match self.sign(message) {
            Ok(sig) => sig,
            Err(e) => {
                warn!(error = %e, "Could not compute expected signature");
                return false;
            }
        };
        constant_time_eq(expected.as_bytes(), provided_hex.as_bytes())
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Sign `message` with `secret` (lower-case hex HMAC-SHA256).
pub fn sign(message: &[u8], secret: &[u8]) -> Result<String, SigningError> {
    Signer::new(secret).sign(message)
}

/// Verify a hex signature for `message` under `secret`.
pub fn verify(message: &[u8], provided_hex: &str, secret: &[u8]) -> bool {
    Signer::new(secret).verify(message, provided_hex)
}

/// Equal-length constant-time comparison; unequal lengths fail immediately.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
