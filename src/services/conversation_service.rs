use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::conversation::Conversation;
use crate::store::ChatStore;

pub struct ConversationService;

impl ConversationService {
    /// Create a conversation between two distinct identities.
    ///
    /// No dedup: the same pair may open several conversations; callers
    /// wanting one-per-pair semantics need a uniqueness constraint upstream.
    pub async fn create(
        store: &dyn ChatStore,
        initiator: Uuid,
        recipient: Uuid,
    ) -> AppResult<Conversation> {
        if initiator == recipient {
            return Err(AppError::Validation(
                "conversation requires two distinct participants".into(),
            ));
        }
        store.create_conversation(initiator, recipient).await
    }

    /// Load a conversation and verify the identity is one of its two
    /// participants.
    pub async fn load_for_participant(
        store: &dyn ChatStore,
        conversation_id: Uuid,
        identity: Uuid,
    ) -> AppResult<Conversation> {
        let conversation = store
            .conversation(conversation_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !conversation.has_participant(identity) {
            return Err(AppError::Forbidden);
        }
        Ok(conversation)
    }
}
