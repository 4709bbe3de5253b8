//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tesseract_transport::{
        Connection, PendingConnection, Transport, TransportError, WebSocketConnection,
        WebSocketTransport,
    };
    use tokio::io::AsyncWriteExt;
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on a random port, connects one client, and returns both ends.
    async fn connected_pair() -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have addr");

        let server = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.upgrade().await.expect("handshake should succeed")
        });

        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("task should complete");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (conn, mut client) = connected_pair().await;
        assert!(conn.id().into_inner() > 0);

        conn.send(br#"{"event":"welcome"}"#)
            .await
            .expect("send should succeed");
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "UTF-8 payloads go out as text frames");
        assert_eq!(msg.into_data().as_ref(), br#"{"event":"welcome"}"#);

        client
            .send(Message::Text(r#"{"event":"login-request"}"#.into()))
            .await
            .unwrap();
        let received = conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"event":"login-request"}"#);
    }

    #[tokio::test]
    async fn test_websocket_non_utf8_goes_out_as_binary() {
        let (conn, mut client) = connected_pair().await;

        conn.send(&[0xff, 0xfe]).await.expect("send should succeed");

        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (conn, mut client) = connected_pair().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_close_while_reader_is_parked() {
        // One task sits in recv() while another closes the connection:
        // the close must not wait for the reader's lock.
        let (conn, mut client) = connected_pair().await;
        let conn = Arc::new(conn);

        let reader = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(2), conn.close())
            .await
            .expect("close should not block on the reader")
            .expect("close should succeed");

        // The client sees the close frame and answers it, which ends the
        // parked read.
        let frame = client.next().await.unwrap().unwrap();
        assert!(frame.is_close());
        let _ = client.close(None).await;

        let read = tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .expect("reader should finish")
            .expect("reader task should not panic");
        assert!(matches!(read, Ok(None) | Err(_)));
    }

    #[tokio::test]
    async fn test_accept_returns_before_handshake() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        // A peer that connects but never sends the upgrade request.
        let _silent = tokio::net::TcpStream::connect(addr).await.unwrap();
        let first = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .expect("accept should not wait for the handshake")
            .unwrap();

        let (client, second) = tokio::join!(
            tokio_tungstenite::connect_async(format!("ws://{addr}")),
            async {
                let pending = transport.accept().await.unwrap();
                pending.upgrade().await
            }
        );
        assert!(client.is_ok());
        let second = second.expect("second peer should upgrade");
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn test_upgrade_rejects_non_websocket_peer() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        let mut peer = tokio::net::TcpStream::connect(addr).await.unwrap();
        let pending = transport.accept().await.unwrap();
        peer.write_all(b"hello there\r\n\r\n").await.unwrap();

        let result = pending.upgrade().await;
        assert!(matches!(result, Err(TransportError::HandshakeFailed(_))));
    }
}
