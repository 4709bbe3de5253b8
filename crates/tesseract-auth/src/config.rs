//! Configuration for credential checks and token issuance.

use std::time::Duration;

/// Settings for the [`CredentialVerifier`](crate::CredentialVerifier).
///
/// Sensible defaults are provided; override the fields you care about:
///
/// ```rust
/// use std::time::Duration;
/// use tesseract_auth::AuthConfig;
///
/// let config = AuthConfig {
///     token_ttl: Duration::from_secs(60 * 60),
///     ..AuthConfig::default()
/// };
/// assert_eq!(config.salt_length, 12);
/// ```
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// How long a token issued by `authenticate` stays valid.
    ///
    /// Default: 12 hours.
    pub token_ttl: Duration,

    /// Length, in characters, of the salt generated for new users.
    ///
    /// Default: 12.
    pub salt_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(12 * 60 * 60),
            salt_length: 12,
        }
    }
}
