//! Unified error type for the Tesseract server.

use tesseract_auth::AuthError;
use tesseract_protocol::ProtocolError;
use tesseract_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TesseractError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A credential store failure surfaced through the verifier.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The HTTP listener failed.
    #[error("http server error: {0}")]
    Io(#[from] std::io::Error),
}
