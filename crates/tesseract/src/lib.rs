//! # Tesseract
//!
//! Authentication and single-session presence for realtime services.
//!
//! Tesseract serves two surfaces from one process: a small request API
//! (register, authenticate, check a token) and a persistent WebSocket
//! channel where a client logs in with its token. Each user holds at most
//! one live connection; logging in again kicks the older one.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tesseract::prelude::*;
//!
//! # async fn start() -> Result<(), TesseractError> {
//! let server = TesseractServerBuilder::new()
//!     .http_bind("0.0.0.0:3000")
//!     .ws_bind("0.0.0.0:3001")
//!     .build(MemoryCredentialStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod api;
mod error;
mod handler;
pub mod logging;
mod server;

pub use error::TesseractError;
pub use server::{TesseractServer, TesseractServerBuilder};

pub use tesseract_auth as auth;
pub use tesseract_protocol as protocol;
pub use tesseract_session as session;
pub use tesseract_transport as transport;

/// The types most servers need, in one import.
pub mod prelude {
    #[cfg(feature = "sqlite")]
    pub use tesseract_auth::SqliteCredentialStore;
    pub use tesseract_auth::{
        AuthConfig, Claim, CredentialStore, MemoryCredentialStore, SigningSecret, TokenCodec,
    };
    pub use tesseract_session::SessionConfig;

    pub use crate::logging::LogFormat;
    pub use crate::{TesseractError, TesseractServer, TesseractServerBuilder};
}
