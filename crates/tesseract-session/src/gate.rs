//! Per-connection authentication state machine.
//!
//! ```text
//!                   login-request (valid token)
//! Unauthenticated ─────────────────────────────→ Authenticated { username }
//!   │  ↺ login-request without token: ignored
//!   │  ↺ login-request with bad token: rejected
//!   │  ↺ any other event: ignored
//! ```
//!
//! The gate only decides. The caller carries out the returned
//! [`GateAction`]: replying `invalid token`, binding the session, and so on.

use tesseract_auth::{Claim, TokenCodec, TokenError};
use tesseract_protocol::ClientEvent;

/// Where a connection is in its authentication lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// No valid token presented yet.
    Unauthenticated,
    /// Authenticated as `username`. Terminal.
    Authenticated { username: String },
}

/// What the caller should do after feeding an event to the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateAction {
    /// Drop the event silently.
    Ignore,
    /// The token didn't verify: send `invalid token`. The error is for
    /// logging only.
    Reject(TokenError),
    /// The connection just authenticated: bind it for `claim.username`.
    Bind(Claim),
    /// A feature-level event from an authenticated connection.
    Forward { event: String },
}

/// Gates one connection until it presents a valid token.
#[derive(Debug)]
pub struct ConnectionGate {
    state: GateState,
}

impl ConnectionGate {
    /// A gate for a freshly accepted connection.
    pub fn new() -> Self {
        Self {
            state: GateState::Unauthenticated,
        }
    }

    /// The current state.
    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// The authenticated username, if any.
    pub fn username(&self) -> Option<&str> {
        match &self.state {
            GateState::Authenticated { username } => Some(username),
            GateState::Unauthenticated => None,
        }
    }

    /// Feeds one inbound event through the gate.
    pub fn handle(&mut self, event: ClientEvent, tokens: &TokenCodec) -> GateAction {
        if let GateState::Authenticated { .. } = self.state {
            return match event {
                // A connection authenticates at most once.
                ClientEvent::LoginRequest { .. } => GateAction::Ignore,
                ClientEvent::Other { event } => GateAction::Forward { event },
            };
        }

        match event {
            ClientEvent::LoginRequest { token: None } => GateAction::Ignore,
            ClientEvent::LoginRequest { token: Some(token) } => match tokens.verify(&token) {
                Ok(claim) => {
                    self.state = GateState::Authenticated {
                        username: claim.username.clone(),
                    };
                    GateAction::Bind(claim)
                }
                Err(e) => GateAction::Reject(e),
            },
            ClientEvent::Other { .. } => GateAction::Ignore,
        }
    }
}

impl Default for ConnectionGate {
    fn default() -> Self {
        Self::new()
    }
}
