use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::auth::AuthedUser;
use crate::services::conversation_service::ConversationService;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateConversationRequest {
    pub recipient_id: Uuid,
}

#[derive(Serialize)]
pub struct CreateConversationResponse {
    pub id: Uuid,
}

pub async fn create_conversation(
    State(state): State<AppState>,
    AuthedUser(initiator): AuthedUser,
    Json(body): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<CreateConversationResponse>), crate::error::AppError> {
    let conversation =
        ConversationService::create(state.store.as_ref(), initiator, body.recipient_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateConversationResponse {
            id: conversation.id,
        }),
    ))
}
