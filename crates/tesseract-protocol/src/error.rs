//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding event frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, a missing `event` field, or a frame
    /// that isn't a JSON object at all.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
