//! Credentials and session tokens for Tesseract.
//!
//! This crate answers two questions:
//!
//! 1. **Who is this?**: [`CredentialVerifier`] registers users and checks
//!    passwords against a [`CredentialStore`].
//! 2. **Did we say so?**: [`TokenCodec`] issues and verifies signed,
//!    time-bound [`Claim`]s without keeping any per-token state.
//!
//! # How it fits in the stack
//!
//! ```text
//! Request API (above)  ← register / authenticate / checktoken
//!     ↕
//! Auth (this crate)    ← credential checks, token issue + verify
//!     ↕
//! Credential store     ← memory or SQLite
//! ```

#![allow(async_fn_in_trait)]

mod config;
mod credentials;
mod error;
mod secret;
#[cfg(feature = "sqlite")]
mod sqlite;
mod store;
mod token;

pub use config::AuthConfig;
pub use credentials::{CredentialVerifier, generate_salt, hash_password};
pub use error::{AuthError, StoreError, TokenError};
pub use secret::SigningSecret;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCredentialStore;
pub use store::{CredentialRecord, CredentialStore, MemoryCredentialStore};
pub use token::{Claim, TokenCodec, now_millis};
