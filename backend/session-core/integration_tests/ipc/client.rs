//! WebSocket client helpers for the IPC tests.

use session_core::ipc::protocol::{ClientFrame, ClientRequest, ServerFrame, ServerMessage};

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const TEST_AUTH_TOKEN: &str = "test-token-12345";

pub async fn connect(addr: SocketAddr) -> Client {
    let url = format!("ws://{addr}");
    let (ws_stream, _) = connect_async(&url)
        .await
        .expect("Failed to connect to WebSocket server");
    ws_stream
}

pub async fn send(ws: &mut Client, request_id: u64, request: ClientRequest) {
    let json = serde_json::to_string(&ClientFrame {
        request_id,
        request,
    })
    .expect("frame serializes");
    ws.send(Message::Text(json.into()))
        .await
        .expect("Failed to send message");
}

pub async fn receive(ws: &mut Client) -> ServerFrame {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("frame arrives in time")
            .expect("No message received")
            .expect("Error receiving message");
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("valid server frame");
        }
    }
}

/// Skip frames until one matches `predicate`.
pub async fn receive_until<F>(ws: &mut Client, mut predicate: F) -> ServerFrame
where
    F: FnMut(&ServerFrame) -> bool,
{
    loop {
        let frame = receive(ws).await;
        if predicate(&frame) {
            return frame;
        }
    }
}

/// Wait for the response to `request_id`, skipping pushed snapshots.
pub async fn response_to(ws: &mut Client, request_id: u64) -> ServerFrame {
    receive_until(ws, |frame| frame.request_id == request_id).await
}

/// Authenticate and consume the initial snapshot.
pub async fn authenticated(addr: SocketAddr, token: &str) -> Client {
    let mut ws = connect(addr).await;
    send(
        &mut ws,
        1,
        ClientRequest::Auth {
            token: token.to_string(),
        },
    )
    .await;

    let auth = receive(&mut ws).await;
    assert_eq!(
        auth.message,
        ServerMessage::AuthResult {
            success: true,
            error: None
        }
    );
    let initial = receive(&mut ws).await;
    assert!(matches!(initial.message, ServerMessage::State { .. }));
    ws
}

/// True once the server closes the socket; data frames before the close are
/// skipped.
pub async fn is_connection_closed(ws: &mut Client) -> bool {
    let closed = async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return true,
                Some(Ok(_)) => continue,
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), closed)
        .await
        .unwrap_or(false)
}
