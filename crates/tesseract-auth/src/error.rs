//! Error types for the auth layer.

/// Why a token failed to verify.
///
/// Only ever used for logging. Every caller-facing boundary reports all
/// three the same way ("invalid token") so a client learns nothing about
/// which check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Wrong number of segments, bad base64, or an unparseable claim.
    #[error("malformed token")]
    Malformed,

    /// The signature doesn't match the header and claim.
    #[error("token signature mismatch")]
    BadSignature,

    /// The signature is fine but the claim's expiry has passed.
    #[error("token expired")]
    Expired,
}

/// Errors raised by a [`CredentialStore`](crate::CredentialStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store couldn't be reached or a background task died.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    /// The SQLite backend reported an error.
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors from the [`CredentialVerifier`](crate::CredentialVerifier).
///
/// Wrong passwords and unknown users are *not* errors; they are `false` /
/// `None` results. An error here always means the store failed, so a
/// caller can tell "no such user" from "couldn't check".
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The credential store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
