//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a tokio-tungstenite client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use terrabound_transport::{
        Connection, Delivery, Transport, TransportError, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type Client =
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

    /// Binds on a random port, connects one client, returns both ends.
    async fn pair() -> (terrabound_transport::WebSocketConnection, Client) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound address");

        let server = tokio::spawn(async move { transport.accept().await.expect("should accept") });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        (server.await.expect("accept task"), client)
    }

    #[tokio::test]
    async fn test_send_and_receive_both_ways() {
        let (server_conn, mut client) = pair().await;
        assert!(server_conn.id().get() > 0);
        assert!(server_conn.peer_addr().ip().is_loopback());

        server_conn.send(b"hello from server").await.unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from server");

        client
            .send(Message::Binary(b"hello from client".to_vec().into()))
            .await
            .unwrap();
        let received = server_conn.recv().await.unwrap().expect("should have data");
        assert_eq!(received, b"hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_text_frames_arrive_as_bytes() {
        let (server_conn, mut client) = pair().await;

        client
            .send(Message::Text(r#"{"x":1}"#.into()))
            .await
            .unwrap();

        assert_eq!(server_conn.recv().await.unwrap().unwrap(), br#"{"x":1}"#);
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_client_close() {
        let (server_conn, mut client) = pair().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_send_while_another_task_waits_in_recv() {
        let (server_conn, mut client) = pair().await;
        let server_conn = Arc::new(server_conn);

        let reader = {
            let conn = Arc::clone(&server_conn);
            tokio::spawn(async move { conn.recv().await })
        };
        // Give the reader time to park inside recv.
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), server_conn.send(b"ping"))
            .await
            .expect("send must not wait for the reader")
            .unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"ping");

        client.send(Message::Binary(b"pong".to_vec().into())).await.unwrap();
        assert_eq!(reader.await.unwrap().unwrap().unwrap(), b"pong");
    }

    #[tokio::test]
    async fn test_best_effort_frames_still_arrive() {
        let (server_conn, mut client) = pair().await;

        server_conn
            .send_with(b"snapshot", Delivery::BestEffort)
            .await
            .unwrap();

        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"snapshot");
    }

    #[tokio::test]
    async fn test_bind_to_invalid_address_fails() {
        let result = WebSocketTransport::bind("not-an-address").await;
        assert!(matches!(result, Err(TransportError::BindFailed { .. })));
    }
}
