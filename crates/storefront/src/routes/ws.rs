//! Order status WebSocket.
//!
//! GET /ws
//!
//! Protocol:
//! - Client → server: `{"type":"subscribe_order","orderId":N}`. A second
//!   subscription replaces the first.
//! - Server → client: `{"type":"order_update","orderId":N,"newStatus":S,"timestamp":T}`
//!   for every status change of the subscribed order after subscribing.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::{Router, routing::get};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::time::Duration;

use crate::notify::{ClientMessage, ServerMessage};
use crate::state::AppState;

/// Interval between keep-alive pings.
const PING_INTERVAL: Duration = Duration::from_secs(30);

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(handle_ws))
}

async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_session(socket, state))
}

async fn ws_session(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let relay = state.relay();
    let (conn_id, mut updates) = relay.register();

    tracing::debug!(connection = %conn_id, open = relay.connection_count(), "Order WS connected");

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            update = updates.recv() => {
                let Some(update) = update else { break };
                if send_message(&mut sink, &update).await.is_err() {
                    break;
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::SubscribeOrder { order_id }) => {
                                relay.subscribe(conn_id, order_id);
                                tracing::debug!(connection = %conn_id, order_id = %order_id, "Order WS subscribed");
                            }
                            Err(e) => {
                                tracing::warn!(connection = %conn_id, error = %e, "Ignoring malformed WS message");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    relay.remove(conn_id);
    tracing::debug!(connection = %conn_id, "Order WS disconnected");
}

async fn send_message(
    sink: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize WS message");
            return Ok(());
        }
    };
    sink.send(Message::Text(json.into())).await
}
