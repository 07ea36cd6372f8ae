use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message row matching the `messages` table. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Wire envelope published on the backbone after a message row commits.
///
/// Cross-process consumers parse this back out of the backbone payload, so
/// all delivery-relevant fields travel inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBroadcast {
    pub message_id: Uuid,
    pub conversation_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl MessageBroadcast {
    pub fn from_row(row: &Message) -> Self {
        Self {
            message_id: row.id,
            conversation_id: row.conversation_id,
            author_id: row.sender_id,
            text: row.content.clone(),
            created_at: row.created_at,
        }
    }

    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
