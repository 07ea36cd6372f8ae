use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::message::MessageBroadcast;

/// Inbound WebSocket events from client to server
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsInboundEvent {
    #[serde(rename = "subscribe")]
    Subscribe { conversation_id: Uuid },

    #[serde(rename = "unsubscribe")]
    Unsubscribe { conversation_id: Uuid },
}

/// Outbound WebSocket events from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsOutboundEvent {
    #[serde(rename = "subscribed")]
    Subscribed { conversation_id: Uuid },

    #[serde(rename = "unsubscribed")]
    Unsubscribed { conversation_id: Uuid },

    /// New message fan-out. Supersets the required minimum of
    /// `{text, author_id}` with id and timestamp for client-side ordering.
    #[serde(rename = "message.new")]
    MessageNew {
        message_id: Uuid,
        conversation_id: Uuid,
        author_id: Uuid,
        text: String,
        created_at: DateTime<Utc>,
    },

    #[serde(rename = "error")]
    Error {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        conversation_id: Option<Uuid>,
    },
}

impl WsOutboundEvent {
    pub fn from_broadcast(broadcast: MessageBroadcast) -> Self {
        Self::MessageNew {
            message_id: broadcast.message_id,
            conversation_id: broadcast.conversation_id,
            author_id: broadcast.author_id,
            text: broadcast.text,
            created_at: broadcast.created_at,
        }
    }

    /// Map a subscribe/unsubscribe failure to its client-visible form.
    pub fn from_error(err: &AppError, conversation_id: Option<Uuid>) -> Self {
        let code = match err {
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden => "forbidden",
            AppError::NotFound => "not_found",
            AppError::InvalidIdentifier(_) => "invalid_identifier",
            AppError::Validation(_) => "validation_error",
            AppError::BackboneUnavailable(_) => "backbone_unavailable",
            _ => "internal",
        };

        Self::Error {
            code: code.to_string(),
            message: err.to_string(),
            conversation_id,
        }
    }
}
