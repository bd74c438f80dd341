use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::auth::resolve_principal;
use super::error::ApiError;
use crate::auth::Principal;
use crate::notifications::{PushHub, PushMessage, Topic};
use crate::AppState;

#[derive(Deserialize)]
pub struct WsAuthQuery {
    token: Option<String>,
}

/// WebSocket endpoint for real-time notifications.
///
/// Browsers cannot set headers on the handshake, so the bearer token comes
/// in the query string and is checked here rather than by the access layer.
/// The token is checked before the upgrade itself.
pub async fn notifications_ws(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsAuthQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    let principal = resolve_principal(&state, &token)
        .await
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };
    let hub = state.hub.clone();
    Ok(ws
        .on_upgrade(move |socket| handle_push_stream(socket, hub, principal))
        .into_response())
}

/// Forward a topic into the connection's shared outbox until either side closes
fn forward_topic(hub: &PushHub, topic: Topic, outbox: mpsc::Sender<PushMessage>) -> JoinHandle<()> {
    let mut rx = hub.subscribe(topic);
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    if outbox.send(message).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(topic = %topic, skipped, "Push subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn handle_push_stream(socket: WebSocket, hub: Arc<PushHub>, principal: Principal) {
    let (sender, receiver) = socket.split();
    pump(sender, receiver, hub, principal).await;
}

/// Relay pushes to the client until it closes or the sink fails.
async fn pump<Tx, Rx, E>(mut sender: Tx, mut receiver: Rx, hub: Arc<PushHub>, principal: Principal)
where
    Tx: Sink<Message> + Unpin,
    Rx: Stream<Item = Result<Message, E>> + Unpin,
{
    let mut private = hub.connect(&principal.user_id);
    let connection_id = private.connection_id;

    let (topic_tx, mut topic_rx) = mpsc::channel::<PushMessage>(64);
    let forwarders: Vec<JoinHandle<()>> = Topic::ALL
        .into_iter()
        .map(|topic| forward_topic(&hub, topic, topic_tx.clone()))
        .collect();
    drop(topic_tx);

    info!(user_id = %principal.user_id, connection_id, "Notification socket opened");

    loop {
        let outgoing = tokio::select! {
            message = private.rx.recv() => message,
            message = topic_rx.recv() => message,
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                    continue;
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            },
        };

        let Some(message) = outgoing else { break };
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "Failed to encode push message");
                continue;
            }
        };
        if sender.send(Message::Text(text)).await.is_err() {
            break;
        }
    }

    for forwarder in forwarders {
        forwarder.abort();
    }
    hub.disconnect(&principal.user_id, connection_id);
    info!(user_id = %principal.user_id, connection_id, "Notification socket closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UserRole;
    use crate::notifications::USER_DESTINATION;
    use futures::channel::mpsc as frames;
    use serde_json::{json, Value};

    fn principal() -> Principal {
        Principal {
            user_id: "u-1".into(),
            email: "seeker@example.com".into(),
            role: UserRole::JobSeeker,
        }
    }

    async fn next_json(rx: &mut frames::Receiver<Message>) -> Value {
        match rx.next().await {
            Some(Message::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pump_relays_private_and_topic_frames() {
        let hub = Arc::new(PushHub::new(8, 8));
        let (out_tx, mut out_rx) = frames::channel::<Message>(16);
        let (in_tx, in_rx) = frames::unbounded::<Result<Message, axum::Error>>();

        let task = tokio::spawn(pump(out_tx, in_rx, hub.clone(), principal()));
        while hub.connection_count("u-1") == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(hub.send_to_user("u-1", json!({ "message": "hello" })), 1);
        let frame = next_json(&mut out_rx).await;
        assert_eq!(frame["destination"], USER_DESTINATION);
        assert_eq!(frame["payload"]["message"], "hello");

        hub.broadcast(Topic::NewJobs, json!({ "title": "Rust Engineer" }));
        let frame = next_json(&mut out_rx).await;
        assert_eq!(frame["destination"], "/topic/new-jobs");
        assert_eq!(frame["payload"]["title"], "Rust Engineer");

        in_tx.unbounded_send(Ok(Message::Ping(vec![7]))).unwrap();
        assert_eq!(out_rx.next().await, Some(Message::Pong(vec![7])));

        in_tx.unbounded_send(Ok(Message::Close(None))).unwrap();
        task.await.unwrap();
        assert_eq!(hub.connection_count("u-1"), 0);
    }

    #[tokio::test]
    async fn test_pump_stops_when_client_goes_away() {
        let hub = Arc::new(PushHub::new(8, 8));
        let (out_tx, _out_rx) = frames::channel::<Message>(16);
        let (in_tx, in_rx) = frames::unbounded::<Result<Message, axum::Error>>();
        drop(in_tx);

        pump(out_tx, in_rx, hub.clone(), principal()).await;
        assert_eq!(hub.connection_count("u-1"), 0);
    }
}
