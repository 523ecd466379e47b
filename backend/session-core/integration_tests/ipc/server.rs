use crate::helpers::{FakeBackend, start_controller, start_running};
use crate::ipc::client::{
    TEST_AUTH_TOKEN, authenticated, connect, is_connection_closed, receive, receive_until,
    response_to, send,
};

use session_core::CommandMode;
use session_core::ipc::protocol::{ClientRequest, ErrorCode, ServerMessage};
use session_core::ipc::start_ipc_server;

use futures_util::SinkExt;
use tokio_tungstenite::tungstenite::Message;

/// **VALUE**: A client with the wrong token is told so and disconnected.
///
/// **WHY THIS MATTERS**: The socket can run commands against the device; any
/// local process that finds the port must not be able to use it.
///
/// **BUG THIS CATCHES**: Keeping an unauthenticated connection open, or
/// pushing session state before the token is checked.
#[tokio::test]
async fn given_wrong_token_when_authenticating_then_rejected_and_closed() {
    // GIVEN: A server on an ephemeral port
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;
    let handle = start_ipc_server(0, Some(TEST_AUTH_TOKEN.to_string()), controller)
        .await
        .expect("Failed to start IPC server");

    // WHEN: Authenticating with a bad token
    let mut ws = connect(handle.local_addr()).await;
    send(
        &mut ws,
        1,
        ClientRequest::Auth {
            token: "wrong-token".to_string(),
        },
    )
    .await;

    // THEN: auth_result false, then the socket closes
    let response = receive(&mut ws).await;
    assert_eq!(response.request_id, 1);
    assert!(matches!(
        response.message,
        ServerMessage::AuthResult { success: false, .. }
    ));
    assert!(is_connection_closed(&mut ws).await);

    handle.shutdown().await;
}

#[tokio::test]
async fn given_first_frame_not_auth_when_sent_then_connection_closed() {
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;
    let handle = start_ipc_server(0, Some(TEST_AUTH_TOKEN.to_string()), controller)
        .await
        .expect("Failed to start IPC server");

    let mut ws = connect(handle.local_addr()).await;
    send(&mut ws, 3, ClientRequest::StartServer).await;

    assert!(is_connection_closed(&mut ws).await);
    assert_eq!(backend.count("start_server"), 0);

    handle.shutdown().await;
}

#[tokio::test]
async fn given_generated_token_when_server_started_then_handle_exposes_it() {
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;
    let handle = start_ipc_server(0, None, controller)
        .await
        .expect("Failed to start IPC server");

    let token = handle.auth_token().to_string();
    assert!(!token.is_empty());
    let _ws = authenticated(handle.local_addr(), &token).await;

    handle.shutdown().await;
}

#[tokio::test]
async fn given_authenticated_client_when_get_state_then_snapshot_echoes_request_id() {
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;
    controller.update_connect_address("127.0.0.1:5555");
    let handle = start_ipc_server(0, Some(TEST_AUTH_TOKEN.to_string()), controller)
        .await
        .expect("Failed to start IPC server");
    let mut ws = authenticated(handle.local_addr(), TEST_AUTH_TOKEN).await;

    send(&mut ws, 7, ClientRequest::GetState).await;

    let response = response_to(&mut ws, 7).await;
    match response.message {
        ServerMessage::State { state } => {
            assert_eq!(state.connect_address, "127.0.0.1:5555");
            assert!(!state.server_running);
        }
        other => panic!("expected state, got {other:?}"),
    }

    handle.shutdown().await;
}

/// **VALUE**: Requests are acknowledged and their effect is pushed as state.
///
/// **WHY THIS MATTERS**: Front-ends render from pushed snapshots; an ack alone
/// does not tell them when the queued work finished.
///
/// **BUG THIS CATCHES**: Missing pushes after worker-side changes.
#[tokio::test]
async fn given_start_server_request_when_processed_then_ack_and_pushed_state() {
    // GIVEN: An authenticated client
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;
    let handle = start_ipc_server(0, Some(TEST_AUTH_TOKEN.to_string()), controller)
        .await
        .expect("Failed to start IPC server");
    let mut ws = authenticated(handle.local_addr(), TEST_AUTH_TOKEN).await;

    // WHEN: Starting the server
    send(&mut ws, 2, ClientRequest::StartServer).await;

    // THEN: Acked, then a pushed snapshot shows it running
    let ack = response_to(&mut ws, 2).await;
    assert_eq!(ack.message, ServerMessage::Ack);
    let pushed = receive_until(&mut ws, |frame| {
        matches!(&frame.message, ServerMessage::State { state } if state.server_running)
    })
    .await;
    assert_eq!(pushed.request_id, 0);
    assert_eq!(backend.count("start_server"), 1);

    handle.shutdown().await;
}

#[tokio::test]
async fn given_remote_command_when_requested_then_rejected_error_frame() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;
    let handle = start_ipc_server(0, Some(TEST_AUTH_TOKEN.to_string()), controller)
        .await
        .expect("Failed to start IPC server");
    let mut ws = authenticated(handle.local_addr(), TEST_AUTH_TOKEN).await;

    send(
        &mut ws,
        4,
        ClientRequest::RunCommand {
            input: "connect 8.8.8.8:5555".to_string(),
            mode: CommandMode::Direct,
        },
    )
    .await;

    let response = response_to(&mut ws, 4).await;
    assert_eq!(
        response.message,
        ServerMessage::Error {
            code: ErrorCode::Rejected,
            message: "This app only connects to this device.".to_string(),
        }
    );
    assert_eq!(backend.count("run"), 0);

    handle.shutdown().await;
}

#[tokio::test]
async fn given_pair_request_when_state_pushed_then_code_never_serialized() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;
    let handle = start_ipc_server(0, Some(TEST_AUTH_TOKEN.to_string()), controller.clone())
        .await
        .expect("Failed to start IPC server");
    let mut ws = authenticated(handle.local_addr(), TEST_AUTH_TOKEN).await;

    send(
        &mut ws,
        5,
        ClientRequest::Pair {
            address: "127.0.0.1:37000".to_string(),
            code: "482913".to_string(),
        },
    )
    .await;
    assert_eq!(response_to(&mut ws, 5).await.message, ServerMessage::Ack);
    controller.drain().await.expect("drained");

    send(&mut ws, 6, ClientRequest::GetState).await;
    let response = response_to(&mut ws, 6).await;
    let json = serde_json::to_string(&response).expect("frame serializes");
    assert!(json.contains("\"connection_state\":\"paired\""));
    assert!(!json.contains("482913"));

    handle.shutdown().await;
}

#[tokio::test]
async fn given_invalid_json_when_sent_then_invalid_message_error() {
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;
    let handle = start_ipc_server(0, Some(TEST_AUTH_TOKEN.to_string()), controller)
        .await
        .expect("Failed to start IPC server");
    let mut ws = authenticated(handle.local_addr(), TEST_AUTH_TOKEN).await;

    ws.send(Message::Text("{not json".into()))
        .await
        .expect("Failed to send message");

    let response = receive_until(&mut ws, |frame| {
        matches!(frame.message, ServerMessage::Error { .. })
    })
    .await;
    assert!(matches!(
        response.message,
        ServerMessage::Error {
            code: ErrorCode::InvalidMessage,
            ..
        }
    ));

    handle.shutdown().await;
}

#[tokio::test]
async fn given_open_connection_when_server_shut_down_then_client_disconnected() {
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;
    let handle = start_ipc_server(0, Some(TEST_AUTH_TOKEN.to_string()), controller)
        .await
        .expect("Failed to start IPC server");
    let mut ws = authenticated(handle.local_addr(), TEST_AUTH_TOKEN).await;

    handle.shutdown().await;

    assert!(is_connection_closed(&mut ws).await);
}
