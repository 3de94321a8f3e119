//! WebSocket transport.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
        Query, State,
    },
    response::IntoResponse,
};
use futures::SinkExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::clients::{encode, ClientManager, ConnectionId, Registration};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::world::WorldInput;

/// Shared handles for connection tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Input channel into the world task.
    pub inputs: mpsc::Sender<WorldInput>,
    /// Open connections.
    pub clients: Arc<ClientManager>,
}

#[derive(Debug)]
enum NetError {
    #[allow(dead_code)]
    Ws(axum::Error),
    InputClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

/// Query parameters of the upgrade request.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    #[serde(default, rename = "clientId")]
    client_id: Option<String>,
}

/// Upgrade `/ws` requests.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<ConnectQuery>,
) -> impl IntoResponse {
    let client_id = query.client_id.unwrap_or_else(|| "unknown".to_owned());
    let span = info_span!("conn", client_id = %client_id);
    ws.on_upgrade(move |socket| handle_socket(socket, client_id, state).instrument(span))
}

async fn handle_socket(mut socket: WebSocket, client_id: String, state: AppState) {
    let Some(Registration {
        connection,
        outbound,
    }) = state.clients.register(&client_id)
    else {
        warn!("client id already connected");
        let _ = send_message(&mut socket, &ServerMessage::error("Client id already connected")).await;
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::POLICY,
                reason: "duplicate client id".into(),
            })))
            .await;
        return;
    };
    info!(connection, "client connected");

    match run_client_loop(&mut socket, &client_id, connection, &state, outbound).await {
        Ok(()) => info!("client disconnected"),
        Err(e) => warn!(error = ?e, "client loop exited with error"),
    }

    state.clients.remove(&client_id, connection);
    if state
        .inputs
        .send(WorldInput::Disconnect {
            client_id,
            connection,
        })
        .await
        .is_err()
    {
        debug!("world task gone before disconnect");
    }
    let _ = socket.close().await;
}

async fn run_client_loop(
    socket: &mut WebSocket,
    client_id: &str,
    connection: ConnectionId,
    state: &AppState,
    mut outbound: mpsc::Receiver<Utf8Bytes>,
) -> Result<(), NetError> {
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let Some(msg) = incoming else {
                    return Ok(());
                };
                match msg? {
                    Message::Text(text) => handle_text(client_id, connection, state, text.as_str()).await?,
                    Message::Close(_) => return Ok(()),
                    // Pings are answered by axum; binary frames are not part of the protocol.
                    _ => {}
                }
            }
            queued = outbound.recv() => {
                let Some(text) = queued else {
                    return Ok(());
                };
                socket.send(Message::Text(text)).await?;
            }
        }
    }
}

async fn handle_text(
    client_id: &str,
    connection: ConnectionId,
    state: &AppState,
    text: &str,
) -> Result<(), NetError> {
    let input = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Login { username }) => WorldInput::Login {
            client_id: client_id.to_owned(),
            connection,
            username,
        },
        Ok(ClientMessage::Action(command)) => WorldInput::Action {
            client_id: client_id.to_owned(),
            command,
        },
        Err(e) => {
            debug!(error = %e, "invalid client message");
            state
                .clients
                .send_to(client_id, &ServerMessage::error(format!("Invalid message: {e}")));
            return Ok(());
        }
    };
    state
        .inputs
        .send(input)
        .await
        .map_err(|_| NetError::InputClosed)
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), NetError> {
    let Some(text) = encode(msg) else {
        return Ok(());
    };
    socket.send(Message::Text(text)).await?;
    Ok(())
}
