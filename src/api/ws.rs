//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// WebSocket duplex event stream (spec.md §6 / SPEC_FULL.md §13). Each connected socket is
// wired to the in-process `EventSink` as one subscriber with its own bounded queue; the
// producer (the matching engine) never blocks on this connection, matching the teacher's
// "producer never blocks on a subscriber" design note.
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Extension, Path},
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ControlMessage {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
    Ping,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ControlAck {
    SubscriptionConfirmed { channel: String },
    Pong,
}

pub async fn stream_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<Arc<AppState>>,
    Path(subscriber_id): Path<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, subscriber_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, subscriber_id: Uuid) {
    let mut events = state.events.register(subscriber_id);
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(ctrl) = serde_json::from_str::<ControlMessage>(&text) else { continue };
                        let ack = match ctrl {
                            ControlMessage::Subscribe { channel } => {
                                let _ = state.events.subscribe(subscriber_id, &channel);
                                ControlAck::SubscriptionConfirmed { channel }
                            }
                            ControlMessage::Unsubscribe { channel } => {
                                state.events.unsubscribe(subscriber_id, &channel);
                                continue;
                            }
                            ControlMessage::Ping => ControlAck::Pong,
                        };
                        if let Ok(text) = serde_json::to_string(&ack) {
                            if sink.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
            envelope = events.recv() => {
                let Some(envelope) = envelope else { break };
                let Ok(text) = serde_json::to_string(&envelope) else { continue };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!(%subscriber_id, "websocket subscriber disconnected");
    state.events.close(subscriber_id);
}
