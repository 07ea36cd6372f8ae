//! WebSocket transport: one task per connection.
//!
//! The read loop services subscribe/unsubscribe requests; the write loop
//! drains the connection's outbound queue and owns the heartbeat. The
//! dispatcher only ever touches the queue, never the socket.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::identity_from_headers;
use crate::state::AppState;
use crate::websocket::message_types::{WsInboundEvent, WsOutboundEvent};
use crate::websocket::ConnectionId;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Browser WebSocket clients cannot set headers, so the gateway may pass
    /// the authenticated identity as a query parameter instead.
    pub user_id: Option<Uuid>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<WsParams>,
) -> Result<impl IntoResponse, AppError> {
    let identity = identity_from_headers(&headers)
        .or(params.user_id)
        .ok_or(AppError::Unauthenticated)?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, identity)))
}

async fn handle_socket(socket: WebSocket, state: AppState, identity: Uuid) {
    let (outbound_tx, outbound_rx) = unbounded_channel();
    let connection = match state.registry.register(Some(identity), outbound_tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(%identity, error = %e, "connection registration failed");
            return;
        }
    };
    tracing::info!(connection = %connection, %identity, "websocket session started");

    let (sink, stream) = socket.split();
    let writer = tokio::spawn(write_loop(sink, outbound_rx));

    read_loop(stream, &state, connection).await;

    // Disconnect cancels every subscription this connection holds, then the
    // connection itself. Order matters: no new subscriptions can be created
    // for a connection the registry no longer knows.
    state.subscriptions.drop_connection(connection).await;
    state.registry.deregister(connection).await;
    writer.abort();
    tracing::info!(connection = %connection, %identity, "websocket session closed");
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: UnboundedReceiver<WsOutboundEvent>,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick fires immediately

    loop {
        tokio::select! {
            event = outbound.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::error!(error = %e, "outbound event serialization failed");
                        continue;
                    }
                };
                // A transport failure ends only this connection's write loop.
                if sink.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn read_loop(mut stream: SplitStream<WebSocket>, state: &AppState, connection: ConnectionId) {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => handle_inbound(&text, state, connection).await,
            Ok(Message::Binary(_)) => {
                tracing::warn!(connection = %connection, "binary frames not supported");
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {} // ping/pong handled by the framework
        }
    }
}

async fn handle_inbound(text: &str, state: &AppState, connection: ConnectionId) {
    let event = match serde_json::from_str::<WsInboundEvent>(text) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(connection = %connection, error = %e, "unparseable client frame");
            let reply = WsOutboundEvent::Error {
                code: "invalid_frame".into(),
                message: "could not parse event".into(),
                conversation_id: None,
            };
            reply_to(state, connection, reply).await;
            return;
        }
    };

    match event {
        WsInboundEvent::Subscribe { conversation_id } => {
            let reply = match state.subscriptions.subscribe(connection, conversation_id).await {
                Ok(_) => WsOutboundEvent::Subscribed { conversation_id },
                Err(e) => {
                    tracing::debug!(connection = %connection, %conversation_id, error = %e, "subscribe denied");
                    WsOutboundEvent::from_error(&e, Some(conversation_id))
                }
            };
            reply_to(state, connection, reply).await;
        }
        WsInboundEvent::Unsubscribe { conversation_id } => {
            state.subscriptions.unsubscribe(connection, conversation_id).await;
            reply_to(
                state,
                connection,
                WsOutboundEvent::Unsubscribed { conversation_id },
            )
            .await;
        }
    }
}

async fn reply_to(state: &AppState, connection: ConnectionId, event: WsOutboundEvent) {
    if let Some(outbound) = state.registry.outbound(connection).await {
        // Send failure means the write loop is gone; teardown handles it.
        let _ = outbound.send(event);
    }
}
