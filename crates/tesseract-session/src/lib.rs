//! Connection gating and single-session presence for Tesseract.
//!
//! This crate decides which connection speaks for which user:
//!
//! 1. **Gating**: a fresh connection can do nothing until it presents a
//!    valid token ([`ConnectionGate`]).
//! 2. **Presence**: each user has at most one live connection; a new
//!    login kicks the old one ([`SessionRegistry`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Server handler (above)  ← feeds inbound events, drains SessionHandle queues
//!     ↕
//! Session Layer (this crate)  ← gate per connection, one registry per process
//!     ↕
//! Auth + Protocol (below)  ← TokenCodec, ClientEvent / ServerEvent
//! ```

mod config;
mod gate;
mod handle;
mod registry;

pub use config::SessionConfig;
pub use gate::{ConnectionGate, GateAction, GateState};
pub use handle::{Outbound, SessionHandle};
pub use registry::SessionRegistry;
