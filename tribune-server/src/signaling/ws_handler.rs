use crate::app::AppState;
use crate::signaling::Session;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{error, info, warn};
use tribune_core::{ClientFrame, Identity};

/// Identity stamped onto the upgrade request by the auth layer in front of us.
#[derive(Debug, Deserialize)]
pub struct Handshake {
    pub user_id: String,
    pub name: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(handshake): Query<Handshake>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let display_name = handshake
        .name
        .unwrap_or_else(|| handshake.user_id.clone());
    let identity = Identity::new(handshake.user_id, display_name);

    ws.on_upgrade(move |socket| handle_socket(socket, identity, state))
}

async fn handle_socket(socket: WebSocket, identity: Identity, state: AppState) {
    let (mut session, mut rx) = Session::new(identity, state.room_manager.clone());
    info!(
        "New WebSocket connection: {} as {}",
        session.connection_id(),
        session.identity().user_id
    );

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize server event: {}", e),
            }
        }
    });

    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => session.handle_frame(frame).await,
                    Err(e) => warn!(
                        "Invalid frame from {}: {}",
                        session.identity().user_id,
                        e
                    ),
                },
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = &mut send_task => break,
        }
    }

    send_task.abort();
    let connection = session.connection_id();
    session.close().await;
    info!("WebSocket disconnected: {}", connection);
}
