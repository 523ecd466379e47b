//! IPC WebSocket server.
//!
//! # Protocol
//!
//! 1. The first frame MUST be `auth` with the server token
//! 2. The server answers with `auth_result` (and closes on failure)
//! 3. A `state` snapshot follows immediately, then one per published change
//! 4. Requests are answered with `ack`, `state` or `error`, echoing `request_id`

use crate::LOCAL_HOSTNAME;
use crate::error::SessionError;
use crate::error::ipc::IpcError;
use crate::ipc::client_auth::ClientAuth;
use crate::ipc::handle::IpcServerHandle;
use crate::ipc::protocol::{ClientFrame, ClientRequest, ErrorCode, ServerFrame, ServerMessage};
use crate::session::{SessionController, SessionState};

use common::{ErrorLocation, RedactedPairingCode};

use std::net::SocketAddr;
use std::panic::Location;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn as TokioSpawn;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use uuid::Uuid;

type WsWrite = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Auth responses always use request id 1.
const AUTH_REQUEST_ID: u64 = 1;
/// Pushed snapshots are not tied to a request.
const PUSH_REQUEST_ID: u64 = 0;

/// Start the IPC server on `127.0.0.1:<ipc_port>`.
///
/// Port 0 binds an ephemeral port; read it back from
/// [`IpcServerHandle::local_addr`]. A token is generated when none is given.
///
/// # Errors
///
/// Returns [`IpcError::Io`] if the port cannot be bound.
pub async fn start_ipc_server(
    ipc_port: u16,
    auth_token: Option<String>,
    controller: SessionController,
) -> Result<IpcServerHandle, IpcError> {
    let auth_token = auth_token.unwrap_or_else(|| {
        let token = Uuid::new_v4().to_string();
        info!("Generated IPC auth token");
        token
    });

    let listener = TcpListener::bind((LOCAL_HOSTNAME, ipc_port)).await?;
    let local_addr = listener.local_addr()?;
    info!("IPC server listening on {local_addr}");

    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let token = auth_token.clone();
    let connection_shutdown = shutdown.subscribe();

    let task = TokioSpawn(async move {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!("Client connecting from {addr}");
                        let token = token.clone();
                        let controller = controller.clone();
                        let shutdown = connection_shutdown.clone();
                        TokioSpawn(async move {
                            if let Err(e) = handle_connection(stream, addr, token, controller, shutdown).await {
                                error!("IPC connection {addr} failed: {e}");
                            }
                        });
                    }
                    Err(e) => {
                        error!("IPC accept failed: {e}");
                        break;
                    }
                },
                Ok(()) = shutdown_rx.changed() => break,
            }
        }
        info!("IPC server on {local_addr} stopped");
    });

    Ok(IpcServerHandle {
        local_addr,
        auth_token,
        shutdown,
        task,
    })
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    auth_token: String,
    controller: SessionController,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), IpcError> {
    if !addr.ip().is_loopback() {
        warn!("Rejected non-loopback connection from {addr}");
        return Ok(());
    }

    let ws_stream = accept_async(stream).await.map_err(|e| IpcError::Handshake {
        message: format!("WebSocket handshake failed: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let (mut write, mut read) = ws_stream.split();
    let mut auth = ClientAuth::new(auth_token);

    let first = match read.next().await {
        Some(Ok(Message::Text(text))) => serde_json::from_str::<ClientFrame>(&text).ok(),
        Some(Ok(_)) => None,
        Some(Err(e)) => {
            return Err(IpcError::Read {
                message: format!("Error reading first message: {e}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        None => {
            debug!("Client {addr} disconnected before sending auth");
            return Ok(());
        }
    };

    let Some(ClientRequest::Auth { token }) = first.map(|frame| frame.request) else {
        warn!("Client {addr} auth failed: first message was not auth");
        return Ok(());
    };

    if !auth.validate_token(&token) {
        warn!("Client {addr} auth failed: invalid token");
        send_frame(
            &mut write,
            &ServerFrame::new(
                AUTH_REQUEST_ID,
                ServerMessage::AuthResult {
                    success: false,
                    error: Some("Invalid authentication token".to_string()),
                },
            ),
        )
        .await?;
        return Ok(());
    }

    info!("Client {addr} authenticated");
    send_frame(
        &mut write,
        &ServerFrame::new(
            AUTH_REQUEST_ID,
            ServerMessage::AuthResult {
                success: true,
                error: None,
            },
        ),
    )
    .await?;

    let mut states = controller.subscribe();
    let initial = states.borrow_and_update().clone();
    send_frame(&mut write, &ServerFrame::state(PUSH_REQUEST_ID, initial)).await?;

    loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let response = match serde_json::from_str::<ClientFrame>(&text) {
                        Ok(frame) => handle_request(frame, &auth, &controller),
                        Err(e) => {
                            warn!("Client {addr} sent an invalid frame: {e}");
                            ServerFrame::error(PUSH_REQUEST_ID, ErrorCode::InvalidMessage, "Invalid JSON frame")
                        }
                    };
                    send_frame(&mut write, &response).await?;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => debug!("Client {addr} sent a non-text frame"),
                Some(Err(e)) => {
                    return Err(IpcError::Read {
                        message: format!("Error reading message: {e}"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            },
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot: SessionState = states.borrow_and_update().clone();
                send_frame(&mut write, &ServerFrame::state(PUSH_REQUEST_ID, snapshot)).await?;
            }
            Ok(()) = shutdown.changed() => break,
        }
    }

    let _ = write.close().await;
    info!("Client {addr} disconnected");
    Ok(())
}

fn handle_request(
    frame: ClientFrame,
    auth: &ClientAuth,
    controller: &SessionController,
) -> ServerFrame {
    let ClientFrame {
        request_id,
        request,
    } = frame;
    debug!("IPC request {request_id}: {}", request.kind());

    if !auth.is_authenticated() {
        return ServerFrame::error(request_id, ErrorCode::AuthError, "Not authenticated");
    }

    let result: Result<(), SessionError> = match request {
        ClientRequest::Auth { .. } => {
            return ServerFrame::error(
                request_id,
                ErrorCode::AuthError,
                "Auth handshake already completed",
            );
        }
        ClientRequest::GetState => {
            return ServerFrame::state(request_id, controller.snapshot());
        }
        ClientRequest::StartServer => controller.start_server(),
        ClientRequest::StopServer => controller.stop_server(),
        ClientRequest::Pair { address, code } => {
            controller.request_pair(&address, RedactedPairingCode::new(code))
        }
        ClientRequest::Connect { address } => controller.request_connect(&address),
        ClientRequest::Disconnect => controller.request_disconnect(),
        ClientRequest::RunCommand { input, mode } => controller.run_command(&input, mode),
        ClientRequest::PairingReply { input } => controller.submit_pairing_reply(&input),
        ClientRequest::ClearOutput => {
            controller.clear_command_output();
            Ok(())
        }
        ClientRequest::ClearError => {
            controller.clear_error();
            Ok(())
        }
    };

    match result {
        Ok(()) => ServerFrame::new(request_id, ServerMessage::Ack),
        Err(SessionError::Actor { message, .. }) => {
            ServerFrame::error(request_id, ErrorCode::Internal, message)
        }
        Err(e) => ServerFrame::error(request_id, ErrorCode::Rejected, e.user_message()),
    }
}

async fn send_frame(write: &mut WsWrite, frame: &ServerFrame) -> Result<(), IpcError> {
    let json = serde_json::to_string(frame)?;
    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| IpcError::Send {
            message: format!("Failed to send frame: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}
