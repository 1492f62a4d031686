//! WebSocket adapter over the change notifier
//!
//! Every connected client receives `user_claimed` / `task_completed` events. A client may send
//! `{"type":"auth","userId":N}` to identify itself, after which events it originated are no
//! longer echoed back to it.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::AppState;
use crate::notify::{FarmingEvent, Subscription};

/// Client-to-server messages
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Auth { user_id: i64 },
}

/// Server-to-client control messages
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    AuthSuccess,
}

pub async fn live_updates_handler(
    ws: WebSocketUpgrade,
    State(service): State<AppState>,
) -> Response {
    let subscription = service.notifier().subscribe(None);
    ws.on_upgrade(move |socket| handle_socket(socket, subscription))
}

async fn handle_socket(socket: WebSocket, mut subscription: Subscription) {
    let (mut sender, mut receiver) = socket.split();
    info!("WebSocket client connected");

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket receive failed");
                        break;
                    }
                };

                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(ClientMessage::Auth { user_id }) => {
                        subscription.set_user(user_id);
                        if send_json(&mut sender, &ServerMessage::AuthSuccess).await.is_err() {
                            break;
                        }
                        debug!(user_id, "WebSocket client authenticated");
                    }
                    Err(e) => warn!(error = %e, "Ignoring malformed WebSocket message"),
                }
            }
            event = subscription.recv() => {
                let Some(event) = event else { break };
                if send_json(&mut sender, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    info!(user_id = ?subscription.user_id(), "WebSocket client disconnected");
}

async fn send_json<S, T>(sender: &mut S, message: &T) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
    T: Serialize,
{
    let text = serde_json::to_string(message).map_err(|_| ())?;
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}
