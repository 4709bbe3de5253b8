//! The session registry: which connection speaks for which user.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is a plain `HashMap` behind `&mut self`. The server
//! keeps it behind one `tokio::sync::Mutex`, and every `bind` runs while
//! that lock is held. Two logins racing for the same user are therefore
//! serialized: the second one always sees (and evicts) the first.

use std::collections::HashMap;

use tesseract_protocol::ServerEvent;
use tesseract_transport::ConnectionId;

use crate::{SessionConfig, SessionHandle};

/// Maps each username to its one live connection.
///
/// ## Lifecycle per username
///
/// ```text
///            bind(A)                 bind(B): A kicked + closed
/// Unbound ───────────→ Bound(A) ─────────────────────────────→ Bound(B)
///    ↑                    │
///    └───── unbind(A) ────┘
/// ```
pub struct SessionRegistry {
    /// Live bindings. One entry per username (key invariant).
    bindings: HashMap<String, SessionHandle>,

    config: SessionConfig,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            bindings: HashMap::new(),
            config,
        }
    }

    /// Binds `handle` as the live connection for `username`.
    ///
    /// If another connection held the binding, it is sent `kicked`, told
    /// to close, and dropped from the registry before the new binding is
    /// installed. The new connection is then sent `welcome`.
    ///
    /// Returns the id of the evicted connection, if there was one.
    pub fn bind(&mut self, username: &str, handle: SessionHandle) -> Option<ConnectionId> {
        let new_id = handle.id();

        let evicted = match self.bindings.remove(username) {
            Some(prior) if prior.id() != new_id => {
                prior.emit(ServerEvent::Kicked {
                    message: self.config.kick_message.clone(),
                });
                prior.disconnect();
                tracing::info!(
                    %username,
                    evicted = %prior.id(),
                    replacement = %new_id,
                    "evicted prior connection"
                );
                Some(prior.id())
            }
            _ => None,
        };

        handle.emit(ServerEvent::Welcome);
        self.bindings.insert(username.to_string(), handle);
        tracing::info!(%username, conn_id = %new_id, "session bound");

        evicted
    }

    /// Removes the binding for `username` if it still belongs to `conn_id`.
    ///
    /// Idempotent: unbinding a connection that was already replaced, or
    /// already unbound, changes nothing and returns `false`.
    pub fn unbind(&mut self, username: &str, conn_id: ConnectionId) -> bool {
        match self.bindings.get(username) {
            Some(current) if current.id() == conn_id => {
                self.bindings.remove(username);
                tracing::info!(%username, %conn_id, "session unbound");
                true
            }
            _ => {
                tracing::debug!(%username, %conn_id, "unbind skipped, not the live binding");
                false
            }
        }
    }

    /// Returns the handle currently bound to `username`.
    pub fn get(&self, username: &str) -> Option<&SessionHandle> {
        self.bindings.get(username)
    }

    /// Returns the id of the connection currently bound to `username`.
    pub fn connection_for(&self, username: &str) -> Option<ConnectionId> {
        self.bindings.get(username).map(SessionHandle::id)
    }

    /// Iterates over the usernames that currently have a live connection.
    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Returns the number of bound users.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nobody is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::sync::mpsc::error::TryRecvError;

    use super::*;
    use crate::Outbound;

    fn conn(id: u64) -> (SessionHandle, UnboundedReceiver<Outbound>) {
        SessionHandle::channel(ConnectionId::new(id))
    }

    /// Drains everything currently queued for a connection.
    fn drain(rx: &mut UnboundedReceiver<Outbound>) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    // =====================================================================
    // bind()
    // =====================================================================

    #[test]
    fn test_bind_unbound_user_sends_welcome() {
        let mut registry = SessionRegistry::default();
        let (a, mut a_rx) = conn(1);

        let evicted = registry.bind("alice", a);

        assert_eq!(evicted, None);
        assert_eq!(drain(&mut a_rx), vec![Outbound::Event(ServerEvent::Welcome)]);
        assert_eq!(registry.connection_for("alice"), Some(ConnectionId::new(1)));
    }

    #[test]
    fn test_bind_second_connection_kicks_and_closes_first() {
        let mut registry = SessionRegistry::default();
        let (a, mut a_rx) = conn(1);
        let (b, mut b_rx) = conn(2);
        registry.bind("alice", a);
        drain(&mut a_rx);

        let evicted = registry.bind("alice", b);

        assert_eq!(evicted, Some(ConnectionId::new(1)));
        assert_eq!(
            drain(&mut a_rx),
            vec![
                Outbound::Event(ServerEvent::Kicked {
                    message: "You have logged in from somewhere else!".into()
                }),
                Outbound::Close,
            ]
        );
        assert_eq!(drain(&mut b_rx), vec![Outbound::Event(ServerEvent::Welcome)]);
        assert_eq!(registry.connection_for("alice"), Some(ConnectionId::new(2)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_bind_uses_configured_kick_message() {
        let mut registry = SessionRegistry::new(SessionConfig {
            kick_message: "replaced".into(),
        });
        let (a, mut a_rx) = conn(1);
        let (b, _b_rx) = conn(2);
        registry.bind("alice", a);
        drain(&mut a_rx);

        registry.bind("alice", b);

        assert_eq!(
            a_rx.try_recv(),
            Ok(Outbound::Event(ServerEvent::Kicked {
                message: "replaced".into()
            }))
        );
    }

    #[test]
    fn test_bind_different_users_are_independent() {
        let mut registry = SessionRegistry::default();
        let (a, mut a_rx) = conn(1);
        let (b, _b_rx) = conn(2);

        registry.bind("alice", a);
        registry.bind("bob", b);
        drain(&mut a_rx);

        assert_eq!(registry.len(), 2);
        assert_eq!(a_rx.try_recv(), Err(TryRecvError::Empty));
        let mut names: Vec<&str> = registry.usernames().collect();
        names.sort();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn test_bind_same_connection_again_does_not_kick_it() {
        let mut registry = SessionRegistry::default();
        let (a, mut a_rx) = conn(1);
        registry.bind("alice", a.clone());
        drain(&mut a_rx);

        let evicted = registry.bind("alice", a);

        assert_eq!(evicted, None);
        assert!(!drain(&mut a_rx).contains(&Outbound::Close));
    }

    #[test]
    fn test_bind_evicting_dead_connection_still_installs_new_one() {
        // The prior connection's task already exited: its queue is closed.
        let mut registry = SessionRegistry::default();
        let (a, a_rx) = conn(1);
        let (b, mut b_rx) = conn(2);
        registry.bind("alice", a);
        drop(a_rx);

        registry.bind("alice", b);

        assert_eq!(registry.connection_for("alice"), Some(ConnectionId::new(2)));
        assert_eq!(drain(&mut b_rx), vec![Outbound::Event(ServerEvent::Welcome)]);
    }

    // =====================================================================
    // unbind()
    // =====================================================================

    #[test]
    fn test_unbind_live_connection_removes_binding() {
        let mut registry = SessionRegistry::default();
        let (a, _a_rx) = conn(1);
        registry.bind("alice", a);

        assert!(registry.unbind("alice", ConnectionId::new(1)));

        assert!(registry.is_empty());
        assert!(registry.get("alice").is_none());
    }

    #[test]
    fn test_unbind_superseded_connection_keeps_current_binding() {
        let mut registry = SessionRegistry::default();
        let (a, _a_rx) = conn(1);
        let (b, _b_rx) = conn(2);
        registry.bind("alice", a);
        registry.bind("alice", b);

        // A's task notices its socket closed and cleans up late.
        let removed = registry.unbind("alice", ConnectionId::new(1));

        assert!(!removed);
        assert_eq!(registry.connection_for("alice"), Some(ConnectionId::new(2)));
    }

    #[test]
    fn test_unbind_twice_is_idempotent() {
        let mut registry = SessionRegistry::default();
        let (a, _a_rx) = conn(1);
        registry.bind("alice", a);

        assert!(registry.unbind("alice", ConnectionId::new(1)));
        assert!(!registry.unbind("alice", ConnectionId::new(1)));
        assert!(!registry.unbind("nobody", ConnectionId::new(9)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_full_lifecycle_bind_evict_unbind_rebind() {
        let mut registry = SessionRegistry::default();
        let (a, _a_rx) = conn(1);
        let (b, _b_rx) = conn(2);
        let (c, mut c_rx) = conn(3);

        registry.bind("alice", a);
        registry.bind("alice", b);
        registry.unbind("alice", ConnectionId::new(1));
        registry.unbind("alice", ConnectionId::new(2));
        assert!(registry.is_empty());

        // Nobody to evict any more.
        assert_eq!(registry.bind("alice", c), None);
        assert_eq!(drain(&mut c_rx), vec![Outbound::Event(ServerEvent::Welcome)]);
    }
}
