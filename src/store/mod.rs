//! Durable storage seam for conversations and messages.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::conversation::Conversation;
use crate::models::message::Message;

mod pg;

pub use pg::PgStore;

/// Fields of a message row chosen by the caller; id and timestamp are
/// assigned at insert time.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Create a conversation between two distinct identities.
    async fn create_conversation(
        &self,
        participant_a: Uuid,
        participant_b: Uuid,
    ) -> AppResult<Conversation>;

    /// Load a conversation by id; `Ok(None)` when absent.
    async fn conversation(&self, id: Uuid) -> AppResult<Option<Conversation>>;

    /// Durably persist a message row and return it as committed.
    async fn insert_message(&self, message: NewMessage) -> AppResult<Message>;
}
