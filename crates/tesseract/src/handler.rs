//! Per-connection handler: login gating, presence binding, and eviction.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The task waits on two things at once:
//!   1. Inbound frames from the peer → fed through the `ConnectionGate`
//!   2. Its own outbound queue → events queued by the registry (`welcome`,
//!      `kicked`) and the close request that follows an eviction
//!
//! Every write is bounded by the server's send timeout. A peer that stops
//! reading is dropped instead of pinning its task (and socket) forever.

use std::sync::Arc;

use tesseract_auth::CredentialStore;
use tesseract_protocol::{ClientEvent, Codec, Frame, ServerEvent};
use tesseract_session::{ConnectionGate, GateAction, Outbound, SessionHandle};
use tesseract_transport::{Connection, ConnectionId, TransportError};

use crate::TesseractError;
use crate::server::ServerState;

/// Drop guard that unbinds a user's session when the handler exits.
///
/// This ensures cleanup happens even if the handler errors out. Since
/// `Drop` is synchronous, we spawn a fire-and-forget task for the async
/// lock. The unbind carries the connection id, so it is a no-op when a
/// newer login already replaced this connection.
struct SessionGuard<S: CredentialStore, C: Codec> {
    username: String,
    conn_id: ConnectionId,
    state: Arc<ServerState<S, C>>,
}

impl<S: CredentialStore, C: Codec> Drop for SessionGuard<S, C> {
    fn drop(&mut self) {
        let username = std::mem::take(&mut self.username);
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut sessions = state.sessions.lock().await;
            sessions.unbind(&username, conn_id);
        });
    }
}

/// Handles a single upgraded connection until it closes.
pub(crate) async fn handle_connection<T, S, C>(
    conn: T,
    state: Arc<ServerState<S, C>>,
) -> Result<(), TesseractError>
where
    T: Connection<Error = TransportError>,
    S: CredentialStore,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (handle, mut outbound) = SessionHandle::channel(conn_id);
    let mut gate = ConnectionGate::new();
    let mut session: Option<SessionGuard<S, C>> = None;

    loop {
        tokio::select! {
            inbound = conn.recv() => {
                let data = match inbound {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::debug!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };

                let frame: Frame = match state.codec.decode(&data) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "ignoring undecodable frame");
                        continue;
                    }
                };

                match gate.handle(ClientEvent::from(frame), &state.tokens) {
                    GateAction::Ignore => {
                        tracing::debug!(%conn_id, "event ignored");
                    }
                    GateAction::Reject(e) => {
                        tracing::debug!(%conn_id, error = %e, "login rejected");
                        if !deliver(&conn, &state, ServerEvent::InvalidToken).await? {
                            break;
                        }
                    }
                    GateAction::Bind(claim) => {
                        state
                            .sessions
                            .lock()
                            .await
                            .bind(&claim.username, handle.clone());
                        session = Some(SessionGuard {
                            username: claim.username,
                            conn_id,
                            state: Arc::clone(&state),
                        });
                    }
                    GateAction::Forward { event } => {
                        let username = session.as_ref().map(|s| s.username.as_str());
                        tracing::debug!(%conn_id, ?username, %event, "no handler for event");
                    }
                }
            }
            Some(out) = outbound.recv() => match out {
                Outbound::Event(event) => {
                    if !deliver(&conn, &state, event).await? {
                        break;
                    }
                }
                Outbound::Close => {
                    tracing::debug!(%conn_id, "closing evicted connection");
                    match tokio::time::timeout(state.send_timeout, conn.close()).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => tracing::debug!(%conn_id, error = %e, "close failed"),
                        Err(_) => tracing::debug!(%conn_id, "close timed out"),
                    }
                    break;
                }
            },
        }
    }

    // conn drops here → socket closed; session drops → unbind fires.
    Ok(())
}

/// Encodes and sends one server event within the send timeout.
///
/// Returns `Ok(false)` if the write timed out; the caller should drop the
/// connection.
async fn deliver<T, S, C>(
    conn: &T,
    state: &ServerState<S, C>,
    event: ServerEvent,
) -> Result<bool, TesseractError>
where
    T: Connection<Error = TransportError>,
    S: CredentialStore,
    C: Codec,
{
    let bytes = state.codec.encode(&event.into_frame())?;
    match tokio::time::timeout(state.send_timeout, conn.send(&bytes)).await {
        Ok(sent) => {
            sent?;
            Ok(true)
        }
        Err(_) => {
            tracing::debug!(conn_id = %conn.id(), "send timed out, dropping connection");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use tesseract_auth::{
        AuthConfig, Claim, CredentialVerifier, MemoryCredentialStore, SigningSecret, TokenCodec,
    };
    use tesseract_protocol::JsonCodec;
    use tesseract_session::SessionRegistry;
    use tokio::sync::{Mutex, mpsc};

    use super::*;

    type TestState = ServerState<MemoryCredentialStore, JsonCodec>;

    /// An in-memory connection. Inbound frames come from a channel; sent
    /// frames go to another. While stalled it never finishes a write,
    /// like a peer that stopped reading and let its receive buffer fill.
    struct MockConnection {
        id: ConnectionId,
        inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
        sent: mpsc::UnboundedSender<Vec<u8>>,
        stalled: Arc<AtomicBool>,
    }

    impl Connection for MockConnection {
        type Error = TransportError;

        async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
            if self.stalled.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            let _ = self.sent.send(data.to_vec());
            Ok(())
        }

        async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
            Ok(self.inbound.lock().await.recv().await)
        }

        async fn close(&self) -> Result<(), Self::Error> {
            if self.stalled.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            Ok(())
        }

        fn id(&self) -> ConnectionId {
            self.id
        }
    }

    /// The test side of a `MockConnection`.
    struct Peer {
        id: ConnectionId,
        inbound: mpsc::UnboundedSender<Vec<u8>>,
        sent: mpsc::UnboundedReceiver<Vec<u8>>,
        stalled: Arc<AtomicBool>,
    }

    impl Peer {
        fn stop_reading(&self) {
            self.stalled.store(true, Ordering::SeqCst);
        }

        fn login(&self, token: &str) {
            let frame = serde_json::json!({ "event": "login-request", "data": { "token": token } });
            self.inbound.send(frame.to_string().into_bytes()).unwrap();
        }

        async fn next_event(&mut self) -> serde_json::Value {
            let bytes = tokio::time::timeout(Duration::from_secs(2), self.sent.recv())
                .await
                .expect("should send in time")
                .expect("connection should still be sending");
            serde_json::from_slice(&bytes).unwrap()
        }
    }

    fn mock(id: u64, stalled: bool) -> (MockConnection, Peer) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let id = ConnectionId::new(id);
        let stalled = Arc::new(AtomicBool::new(stalled));
        let conn = MockConnection {
            id,
            inbound: Mutex::new(inbound_rx),
            sent: sent_tx,
            stalled: Arc::clone(&stalled),
        };
        let peer = Peer {
            id,
            inbound: inbound_tx,
            sent: sent_rx,
            stalled,
        };
        (conn, peer)
    }

    fn state(send_timeout: Duration) -> Arc<TestState> {
        let tokens = Arc::new(TokenCodec::new(SigningSecret::from_bytes([9; 32])));
        Arc::new(ServerState {
            sessions: Mutex::new(SessionRegistry::default()),
            verifier: CredentialVerifier::new(
                MemoryCredentialStore::new(),
                Arc::clone(&tokens),
                AuthConfig::default(),
            ),
            tokens,
            codec: JsonCodec,
            handshake_timeout: Duration::from_secs(1),
            send_timeout,
        })
    }

    fn token(state: &TestState, username: &str) -> String {
        state
            .tokens
            .issue(&Claim::new(username, Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_handle_connection_stalled_peer_is_dropped() {
        let state = state(Duration::from_millis(50));
        let (conn, peer) = mock(1, true);
        let task = tokio::spawn(handle_connection(conn, Arc::clone(&state)));

        // The welcome write never completes; the handler must give up.
        peer.login(&token(&state, "alice"));
        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("handler should exit after the send timeout")
            .expect("handler should not panic");
        assert!(result.is_ok());

        // The guard's unbind runs on a spawned task.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(state.sessions.lock().await.connection_for("alice"), None);
    }

    #[tokio::test]
    async fn test_handle_connection_evicted_peer_that_stopped_reading_is_dropped() {
        let state = state(Duration::from_millis(50));

        let (first_conn, mut first) = mock(1, false);
        let first_task = tokio::spawn(handle_connection(first_conn, Arc::clone(&state)));
        first.login(&token(&state, "alice"));
        assert_eq!(first.next_event().await["event"], "welcome");

        // The kick can't be written; the task must still end.
        first.stop_reading();
        let (second_conn, mut second) = mock(2, false);
        let _second_task = tokio::spawn(handle_connection(second_conn, Arc::clone(&state)));
        second.login(&token(&state, "alice"));
        assert_eq!(second.next_event().await["event"], "welcome");

        let result = tokio::time::timeout(Duration::from_secs(2), first_task)
            .await
            .expect("evicted handler should exit after the send timeout")
            .expect("handler should not panic");
        assert!(result.is_ok());

        // The evicted connection's unbind leaves the new binding alone.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            state.sessions.lock().await.connection_for("alice"),
            Some(second.id)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_handle_connection_concurrent_logins_leave_one_binding() {
        const CLIENTS: u64 = 16;
        let state = state(Duration::from_secs(1));

        let mut peers = Vec::new();
        for id in 1..=CLIENTS {
            let (conn, peer) = mock(id, false);
            tokio::spawn(handle_connection(conn, Arc::clone(&state)));
            peers.push(peer);
        }
        let token = token(&state, "alice");
        for peer in &peers {
            peer.login(&token);
        }

        // Every login is welcomed; every bind after the first evicts the
        // connection bound before it.
        for peer in &mut peers {
            assert_eq!(peer.next_event().await["event"], "welcome");
        }

        let mut survivors = Vec::new();
        for peer in &mut peers {
            match tokio::time::timeout(Duration::from_millis(100), peer.sent.recv()).await {
                Ok(Some(bytes)) => {
                    let event: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
                    assert_eq!(event["event"], "kicked");
                }
                Ok(None) => panic!("connection {} stopped without a kick", peer.id),
                Err(_) => survivors.push(peer.id),
            }
        }

        assert_eq!(survivors.len(), 1, "exactly one login must survive");
        let sessions = state.sessions.lock().await;
        assert_eq!(sessions.connection_for("alice"), Some(survivors[0]));
        assert_eq!(sessions.len(), 1);
    }
}
