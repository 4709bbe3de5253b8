//! Event frames and their typed views.
//!
//! Inbound frames are decoded leniently: the event name decides how the
//! payload is read, and an unknown name is not an error. The connection
//! gate needs to see (and ignore) events it doesn't care about.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event names used on the wire.
pub mod events {
    /// Client → server: present a session token.
    pub const LOGIN_REQUEST: &str = "login-request";
    /// Server → client: the presented token did not verify.
    pub const INVALID_TOKEN: &str = "invalid token";
    /// Server → client: this connection was replaced by a newer login.
    pub const KICKED: &str = "kicked";
    /// Server → client: the connection is now bound to its user.
    pub const WELCOME: &str = "welcome";
}

/// One named event as it travels on the wire.
///
/// `data` is omitted from the JSON when it's `null`, and treated as
/// `null` when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// The event name, e.g. `"login-request"`.
    pub event: String,

    /// The event payload, if any.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Frame {
    /// Creates a frame with no payload.
    pub fn bare(event: &str) -> Self {
        Self {
            event: event.to_string(),
            data: Value::Null,
        }
    }
}

/// An inbound event, as far as the session layer is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A login attempt. `token` is `None` when the payload carries no
    /// usable token (missing, empty, or not a string).
    LoginRequest { token: Option<String> },

    /// Any other event, identified by name only. Feature-level events
    /// live here.
    Other { event: String },
}

impl From<Frame> for ClientEvent {
    fn from(frame: Frame) -> Self {
        if frame.event != events::LOGIN_REQUEST {
            return ClientEvent::Other { event: frame.event };
        }
        let token = frame
            .data
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        ClientEvent::LoginRequest { token }
    }
}

/// An outbound event sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// The token presented in a `login-request` did not verify.
    InvalidToken,

    /// The connection is being closed because the same user logged in
    /// somewhere else. `message` is human-readable.
    Kicked { message: String },

    /// The connection has been bound to its user.
    Welcome,
}

impl ServerEvent {
    /// Returns the wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::InvalidToken => events::INVALID_TOKEN,
            ServerEvent::Kicked { .. } => events::KICKED,
            ServerEvent::Welcome => events::WELCOME,
        }
    }

    /// Converts this event into its wire frame.
    pub fn into_frame(self) -> Frame {
        match self {
            ServerEvent::Kicked { message } => Frame {
                event: events::KICKED.to_string(),
                data: serde_json::json!({ "message": message }),
            },
            other => Frame::bare(other.name()),
        }
    }
}
