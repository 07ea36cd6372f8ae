use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::conversation::Conversation;
use crate::models::message::Message;
use crate::store::{ChatStore, NewMessage};

/// Postgres-backed store. All writes commit before the caller sees the row.
#[derive(Clone)]
pub struct PgStore {
    db: Pool<Postgres>,
}

impl PgStore {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn create_conversation(
        &self,
        participant_a: Uuid,
        participant_b: Uuid,
    ) -> AppResult<Conversation> {
        let row = sqlx::query_as::<_, Conversation>(
            "INSERT INTO conversations (id, participant_a, participant_b) \
             VALUES ($1, $2, $3) \
             RETURNING id, participant_a, participant_b, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(participant_a)
        .bind(participant_b)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    async fn conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        let row = sqlx::query_as::<_, Conversation>(
            "SELECT id, participant_a, participant_b, created_at \
             FROM conversations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }

    async fn insert_message(&self, message: NewMessage) -> AppResult<Message> {
        let row = sqlx::query_as::<_, Message>(
            "INSERT INTO messages (id, conversation_id, sender_id, content) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, conversation_id, sender_id, content, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }
}
