//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a real client to verify data flows
//! both ways and that concurrent send/recv on one connection works.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use quizforge_transport::{Connection, Transport, WebSocketTransport};

    async fn connect_client(
        addr: &str,
    ) -> tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    > {
        let url = format!("ws://{addr}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    /// Binds to an OS-assigned port and returns (transport, addr).
    async fn bind_ephemeral() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().unwrap().to_string();
        (transport, addr)
    }

    #[tokio::test]
    async fn test_accept_and_send_receive() {
        let (mut transport, addr) = bind_ephemeral().await;

        let server_handle =
            tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.expect("task should complete");

        assert!(server_conn.id().into_inner() > 0);

        // Server sends, client receives.
        server_conn
            .send(b"hello from server")
            .await
            .expect("send should succeed");

        use futures_util::StreamExt;
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from server");

        // Client sends, server receives.
        use futures_util::SinkExt;
        use tokio_tungstenite::tungstenite::Message;
        client_ws
            .send(Message::Binary(b"hello from client".to_vec().into()))
            .await
            .unwrap();

        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind_ephemeral().await;

        let server_handle =
            tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        use futures_util::SinkExt;
        use tokio_tungstenite::tungstenite::Message;
        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_send_while_recv_is_parked() {
        // A cloned handle must be able to send while another task is
        // blocked inside recv() waiting for client data.
        let (mut transport, addr) = bind_ephemeral().await;

        let server_handle =
            tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        let recv_conn = server_conn.clone();
        let recv_task = tokio::spawn(async move { recv_conn.recv().await });

        // Give the recv task time to park on the stream.
        tokio::time::sleep(Duration::from_millis(20)).await;

        // This send must not block behind the parked recv.
        tokio::time::timeout(Duration::from_secs(1), server_conn.send(b"push"))
            .await
            .expect("send should not deadlock")
            .expect("send should succeed");

        use futures_util::{SinkExt, StreamExt};
        use tokio_tungstenite::tungstenite::Message;
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"push");

        // Unblock the recv task.
        client_ws
            .send(Message::Binary(b"reply".to_vec().into()))
            .await
            .unwrap();
        let received = recv_task.await.unwrap().unwrap().unwrap();
        assert_eq!(received, b"reply");
    }
}
