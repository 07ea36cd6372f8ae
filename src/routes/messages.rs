use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::auth::AuthedUser;
use crate::services::message_service::MessageService;
use crate::state::AppState;
use crate::topic::TopicResolver;

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct SendMessageResponse {
    pub message_id: Uuid,
    pub created_at: DateTime<Utc>,
}

pub async fn send_message(
    State(state): State<AppState>,
    AuthedUser(author): AuthedUser,
    Path(conversation_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, crate::error::AppError> {
    // Parse through the resolver so malformed ids surface as
    // `InvalidIdentifier` rather than a framework rejection.
    let conversation_id = TopicResolver::resolve_raw(&conversation_id)?.conversation_id();

    let message = MessageService::create_message(
        state.store.as_ref(),
        state.backbone.as_ref(),
        author,
        conversation_id,
        &body.text,
        state.config.max_message_bytes,
    )
    .await?;

    Ok(Json(SendMessageResponse {
        message_id: message.id,
        created_at: message.created_at,
    }))
}
