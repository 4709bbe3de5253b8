//! Wire protocol for Tesseract's persistent channel.
//!
//! Everything on the channel is a named event: a JSON object with an
//! `event` name and an optional `data` payload.
//!
//! - **Types** ([`Frame`], [`ClientEvent`], [`ServerEvent`]): what travels
//!   on the wire and the typed view of it.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Frame / events) → Session (gate, registry)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{ClientEvent, Frame, ServerEvent, events};
