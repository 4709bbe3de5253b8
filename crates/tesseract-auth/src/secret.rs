//! The process-wide token signing secret.

use std::fmt;

use rand::Rng;

/// Number of random bytes in a signing secret.
const SECRET_BYTES: usize = 32;

/// Key used to sign and verify every token this process issues.
///
/// Generate one at startup and hand it to a [`TokenCodec`](crate::TokenCodec).
/// It is never persisted: restarting the process invalidates every token
/// issued before the restart.
#[derive(Clone)]
pub struct SigningSecret([u8; SECRET_BYTES]);

impl SigningSecret {
    /// Generates a fresh secret from the thread-local CSPRNG.
    pub fn generate() -> Self {
        Self(rand::rng().random())
    }

    /// Wraps known key material. Mostly useful in tests.
    pub fn from_bytes(bytes: [u8; SECRET_BYTES]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key material.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Never print key material, not even in debug logs.
impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(..)")
    }
}
