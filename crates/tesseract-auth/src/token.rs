//! Self-verifying session tokens.
//!
//! A token is three base64 segments joined by `.`:
//!
//! ```text
//! base64({"typ":"JWT","alg":"HS256"}) . base64({"username":..,"exp":..}) . base64(HMAC-SHA256)
//! ```
//!
//! The MAC covers the literal text of the first two segments, so the
//! server can check a token with nothing but its signing secret.
//!
//! # No revocation
//!
//! The server keeps no record of the tokens it hands out. A token stays
//! valid until its `exp` passes (or the process restarts and the secret
//! changes); there is no way to withdraw one earlier.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{SigningSecret, TokenError};

type HmacSha256 = Hmac<Sha256>;

/// The fixed token header.
const HEADER_JSON: &str = r#"{"typ":"JWT","alg":"HS256"}"#;

/// The identity and expiry carried by a token.
///
/// `exp` is a Unix timestamp in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Who the token was issued to.
    pub username: String,
    /// When the token stops being valid, in Unix milliseconds.
    pub exp: u64,
}

impl Claim {
    /// Builds a claim for `username` that expires `ttl` from now.
    pub fn new(username: impl Into<String>, ttl: Duration) -> Self {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        Self {
            username: username.into(),
            exp: now_millis().saturating_add(ttl_ms),
        }
    }

    /// Returns `true` if the claim has expired at time `now` (Unix ms).
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.exp <= now
    }
}

/// Issues and verifies tokens with one [`SigningSecret`].
///
/// Pure apart from reading the clock during [`verify`](Self::verify).
/// Share it behind an `Arc`; it is never mutated.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    secret: SigningSecret,
}

impl TokenCodec {
    /// Creates a codec that signs with `secret`.
    pub fn new(secret: SigningSecret) -> Self {
        Self { secret }
    }

    /// Signs `claim` and returns the token string.
    pub fn issue(&self, claim: &Claim) -> String {
        // A struct of a String and a u64 always serializes.
        let claim_json = serde_json::to_vec(claim).expect("claim serializes to JSON");

        let header = STANDARD.encode(HEADER_JSON);
        let claim = STANDARD.encode(claim_json);
        let signature = STANDARD.encode(self.sign(&header, &claim).finalize().into_bytes());

        format!("{header}.{claim}.{signature}")
    }

    /// Verifies `token` against the current time.
    ///
    /// # Errors
    /// Any [`TokenError`]. Never panics, whatever the input.
    pub fn verify(&self, token: &str) -> Result<Claim, TokenError> {
        self.verify_at(token, now_millis())
    }

    /// Verifies `token` as if the current time were `now` (Unix ms).
    ///
    /// The signature is checked before the claim is even decoded, and the
    /// comparison runs in constant time.
    pub fn verify_at(&self, token: &str, now: u64) -> Result<Claim, TokenError> {
        let mut segments = token.split('.');
        let (Some(header), Some(claim), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed);
        };

        let signature = STANDARD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        self.sign(header, claim)
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claim_json = STANDARD.decode(claim).map_err(|_| TokenError::Malformed)?;
        let claim: Claim =
            serde_json::from_slice(&claim_json).map_err(|_| TokenError::Malformed)?;

        if claim.is_expired_at(now) {
            return Err(TokenError::Expired);
        }
        Ok(claim)
    }

    /// Starts a MAC over `<header>.<claim>`.
    fn sign(&self, header: &str, claim: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take a key of any length");
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(claim.as_bytes());
        mac
    }
}

/// Current Unix time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
