//! Password hashing and the credential lifecycle.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha512;

use crate::{AuthConfig, AuthError, Claim, CredentialRecord, CredentialStore, TokenCodec};

type HmacSha512 = Hmac<Sha512>;

/// Generates a random hex salt exactly `length` characters long.
///
/// Draws `ceil(length / 2)` bytes from the thread-local CSPRNG.
pub fn generate_salt(length: usize) -> String {
    let mut bytes = vec![0u8; length.div_ceil(2)];
    rand::rng().fill(&mut bytes[..]);
    let mut salt = hex::encode(bytes);
    salt.truncate(length);
    salt
}

/// Hashes `password` as HMAC-SHA512 keyed by `salt`, hex-encoded.
///
/// Deterministic: the same `(password, salt)` always gives the same hash.
/// This is a fast hash; swapping in a deliberately slow one only needs to
/// keep that contract.
pub fn hash_password(password: &str, salt: &str) -> String {
    hex::encode(password_mac(password, salt).finalize().into_bytes())
}

fn password_mac(password: &str, salt: &str) -> HmacSha512 {
    let mut mac = HmacSha512::new_from_slice(salt.as_bytes())
        .expect("HMAC can take a key of any length");
    mac.update(password.as_bytes());
    mac
}

/// Registers users, checks passwords, and hands out tokens.
///
/// Generic over the [`CredentialStore`] so the same logic runs against
/// memory in tests and SQLite in production.
pub struct CredentialVerifier<S: CredentialStore> {
    store: S,
    tokens: Arc<TokenCodec>,
    config: AuthConfig,
}

impl<S: CredentialStore> CredentialVerifier<S> {
    /// Creates a verifier over `store` that issues tokens with `tokens`.
    pub fn new(store: S, tokens: Arc<TokenCodec>, config: AuthConfig) -> Self {
        Self {
            store,
            tokens,
            config,
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a login for `username`.
    ///
    /// Returns `Ok(false)` if the name is already taken; the existing
    /// record is not touched. The existence check and the insert are one
    /// atomic store operation, so concurrent registrations can't both win.
    ///
    /// # Errors
    /// [`AuthError::Store`] if the store fails.
    pub async fn register(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let salt = generate_salt(self.config.salt_length);
        let hash = hash_password(password, &salt);

        let created = self
            .store
            .insert_if_absent(CredentialRecord {
                username: username.to_string(),
                salt,
                hash,
            })
            .await?;

        if created {
            tracing::info!(%username, "user registered");
        } else {
            tracing::debug!(%username, "registration refused, username taken");
        }
        Ok(created)
    }

    /// Checks `password` against the stored credential for `username`.
    ///
    /// Unknown users and wrong passwords both give `Ok(false)`.
    ///
    /// # Errors
    /// [`AuthError::Store`] if the store fails.
    pub async fn validate(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let Some(record) = self.store.find(username).await? else {
            return Ok(false);
        };

        let Ok(expected) = hex::decode(&record.hash) else {
            tracing::warn!(%username, "stored password hash is not hex");
            return Ok(false);
        };

        // verify_slice compares in constant time.
        Ok(password_mac(password, &record.salt)
            .verify_slice(&expected)
            .is_ok())
    }

    /// Validates the credentials and, if they match, issues a token that
    /// expires after the configured TTL.
    ///
    /// # Errors
    /// [`AuthError::Store`] if the store fails.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<String>, AuthError> {
        if !self.validate(username, password).await? {
            tracing::debug!(%username, "login rejected");
            return Ok(None);
        }

        let claim = Claim::new(username, self.config.token_ttl);
        tracing::info!(%username, exp = claim.exp, "token issued");
        Ok(Some(self.tokens.issue(&claim)))
    }
}
