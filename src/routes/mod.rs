use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;
use crate::websocket::handlers::ws_handler;

pub mod conversations;
pub mod messages;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conversations", post(conversations::create_conversation))
        .route(
            "/conversations/:conversation_id/messages",
            post(messages::send_message),
        )
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "OK" }))
}
