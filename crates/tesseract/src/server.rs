//! `TesseractServer` builder and server loop.
//!
//! This is the entry point for running a Tesseract server. It ties
//! together all the layers: transport → protocol → session → auth, and
//! serves the request API alongside the persistent channel.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tesseract_auth::{
    AuthConfig, CredentialStore, CredentialVerifier, SigningSecret, TokenCodec,
};
use tesseract_protocol::{Codec, JsonCodec};
use tesseract_session::{SessionConfig, SessionRegistry};
use tesseract_transport::{PendingConnection, Transport, WebSocketTransport};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::TesseractError;
use crate::handler::handle_connection;

/// How long a peer gets to complete the WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long one outbound write (or close) may take before the connection
/// is dropped.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared server state passed to each connection handler task and to the
/// request API.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
/// Every bind and unbind goes through the one registry mutex.
pub(crate) struct ServerState<S: CredentialStore, C: Codec> {
    pub(crate) sessions: Mutex<SessionRegistry>,
    pub(crate) verifier: CredentialVerifier<S>,
    pub(crate) tokens: Arc<TokenCodec>,
    pub(crate) codec: C,
    pub(crate) handshake_timeout: Duration,
    pub(crate) send_timeout: Duration,
}

/// Builder for configuring and starting a Tesseract server.
///
/// # Example
///
/// ```rust,ignore
/// use tesseract::prelude::*;
///
/// let server = TesseractServerBuilder::new()
///     .http_bind("0.0.0.0:3000")
///     .ws_bind("0.0.0.0:3001")
///     .build(MemoryCredentialStore::new())
///     .await?;
/// server.run().await
/// ```
pub struct TesseractServerBuilder {
    http_addr: String,
    ws_addr: String,
    auth_config: AuthConfig,
    session_config: SessionConfig,
    secret: Option<SigningSecret>,
    handshake_timeout: Duration,
    send_timeout: Duration,
}

impl TesseractServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            http_addr: "127.0.0.1:3000".to_string(),
            ws_addr: "127.0.0.1:3001".to_string(),
            auth_config: AuthConfig::default(),
            session_config: SessionConfig::default(),
            secret: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Sets the address the request API binds to.
    pub fn http_bind(mut self, addr: &str) -> Self {
        self.http_addr = addr.to_string();
        self
    }

    /// Sets the address the persistent channel binds to.
    pub fn ws_bind(mut self, addr: &str) -> Self {
        self.ws_addr = addr.to_string();
        self
    }

    /// Sets the credential and token configuration.
    pub fn auth_config(mut self, config: AuthConfig) -> Self {
        self.auth_config = config;
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Uses a fixed signing secret instead of a fresh random one.
    ///
    /// Tokens only survive a restart if the secret does.
    pub fn signing_secret(mut self, secret: SigningSecret) -> Self {
        self.secret = Some(secret);
        self
    }

    /// Sets how long a peer gets to finish the WebSocket upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets how long one outbound write may block before the connection
    /// is dropped. A peer that stops reading can't keep its socket open
    /// past this, even after it has been kicked.
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Binds both listeners and assembles the server over `store`.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    ///
    /// # Errors
    /// Fails if either address can't be bound.
    pub async fn build<S: CredentialStore>(
        self,
        store: S,
    ) -> Result<TesseractServer<S, JsonCodec>, TesseractError> {
        let http = TcpListener::bind(&self.http_addr).await?;
        let transport = WebSocketTransport::bind(&self.ws_addr).await?;

        let secret = self.secret.unwrap_or_else(SigningSecret::generate);
        let tokens = Arc::new(TokenCodec::new(secret));

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionRegistry::new(self.session_config)),
            verifier: CredentialVerifier::new(store, Arc::clone(&tokens), self.auth_config),
            tokens,
            codec: JsonCodec,
            handshake_timeout: self.handshake_timeout,
            send_timeout: self.send_timeout,
        });

        Ok(TesseractServer {
            http,
            transport,
            state,
        })
    }
}

impl Default for TesseractServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Tesseract server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct TesseractServer<S: CredentialStore, C: Codec> {
    http: TcpListener,
    transport: WebSocketTransport,
    state: Arc<ServerState<S, C>>,
}

impl<S, C> TesseractServer<S, C>
where
    S: CredentialStore,
    C: Codec,
{
    /// Returns the address the request API is bound to.
    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http.local_addr()
    }

    /// Returns the address the persistent channel is bound to.
    pub fn ws_addr(&self) -> Result<SocketAddr, TesseractError> {
        Ok(self.transport.local_addr()?)
    }

    /// Returns the request API as a router, without serving it.
    pub fn router(&self) -> axum::Router {
        crate::api::router(Arc::clone(&self.state))
    }

    /// Returns the codec that signs and verifies tokens for this server.
    pub fn tokens(&self) -> Arc<TokenCodec> {
        Arc::clone(&self.state.tokens)
    }

    /// Runs the request API and the accept loop.
    ///
    /// Each accepted connection gets its own handler task. Runs until the
    /// HTTP server fails or the process is terminated.
    ///
    /// # Errors
    /// Returns the HTTP server's I/O error if it stops.
    pub async fn run(self) -> Result<(), TesseractError> {
        let app = self.router();
        let Self {
            http,
            transport,
            state,
        } = self;

        tracing::info!(
            http = ?http.local_addr().ok(),
            ws = ?transport.local_addr().ok(),
            "Tesseract server running"
        );

        tokio::select! {
            result = axum::serve(http, app).into_future() => {
                result?;
                Ok(())
            }
            () = accept_loop(transport, state) => Ok(()),
        }
    }
}

/// Accepts peers forever. Each peer's handshake runs in its own task, so a
/// peer that never finishes it only stalls itself.
async fn accept_loop<S, C>(mut transport: WebSocketTransport, state: Arc<ServerState<S, C>>)
where
    S: CredentialStore,
    C: Codec,
{
    loop {
        match transport.accept().await {
            Ok(pending) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let conn_id = pending.id();
                    let conn =
                        match tokio::time::timeout(state.handshake_timeout, pending.upgrade())
                            .await
                        {
                            Ok(Ok(conn)) => conn,
                            Ok(Err(e)) => {
                                tracing::debug!(%conn_id, error = %e, "handshake failed");
                                return;
                            }
                            Err(_) => {
                                tracing::debug!(%conn_id, "handshake timed out");
                                return;
                            }
                        };
                    if let Err(e) = handle_connection(conn, state).await {
                        tracing::debug!(%conn_id, error = %e, "connection ended with error");
                    }
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
            }
        }
    }
}
