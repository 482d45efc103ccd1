use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::models::{ClientEvent, ErrorResponse};
use crate::services::auth_service::{authenticate, AuthUser};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Browsers cannot set headers on an upgrade, so the token may ride
    /// in the query string instead.
    pub token: Option<String>,
}

/// WebSocket handler. The caller is authenticated before the upgrade is
/// accepted; a rejected caller never reaches the hub.
pub async fn websocket_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let user = match authenticate(&headers, params.token.as_deref(), &state.config) {
        Ok(user) => user,
        Err(e) => {
            warn!("Rejecting WebSocket upgrade: {}", e);
            return ErrorResponse::build(e.status(), e.to_string()).into_response();
        }
    };

    info!("New WebSocket connection attempt from user {}", user.id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

/// Drive one connection: a writer task drains the outbox onto the socket
/// while this task reads frames and hands them to the hub, strictly in
/// arrival order.
async fn handle_socket(socket: WebSocket, state: AppState, user: AuthUser) {
    let hub = state.hub.clone();
    let (mut session, mut inbox) = hub.connect(user.identity()).await;
    let connection_id = session.id().clone();

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = inbox.recv().await {
            let text = match serde_json::to_string(event.as_ref()) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize outbound event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => match ClientEvent::parse(&text) {
                    Ok(event) => hub.dispatch(&mut session, event).await,
                    Err(e) => warn!("Dropping frame from connection {}: {}", connection_id, e),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    debug!("WebSocket error on connection {}: {}", connection_id, e);
                    break;
                }
            },
            _ = &mut send_task => {
                debug!("Writer for connection {} stopped", connection_id);
                break;
            }
        }
    }

    hub.disconnect(&mut session).await;
    send_task.abort();
    info!("WebSocket connection {} terminated", connection_id);
}
