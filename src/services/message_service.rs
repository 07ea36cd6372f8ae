//! Message creation: validate, persist, then publish.
//!
//! The two steps after validation are strictly ordered — the row must be
//! durably committed before anything reaches the backbone. There is no
//! transactional coupling between them: a crash after commit loses only the
//! broadcast, and a publish failure never rolls back the row.

use uuid::Uuid;

use crate::backbone::PubSubBackbone;
use crate::error::{AppError, AppResult};
use crate::models::message::{Message, MessageBroadcast};
use crate::services::conversation_service::ConversationService;
use crate::store::{ChatStore, NewMessage};
use crate::topic::TopicResolver;

pub struct MessageService;

impl MessageService {
    /// Create a message in a conversation on behalf of `author`.
    ///
    /// Publish is fire-and-forget relative to the caller: success is
    /// returned once the row is committed, without waiting for delivery.
    pub async fn create_message(
        store: &dyn ChatStore,
        backbone: &dyn PubSubBackbone,
        author: Uuid,
        conversation_id: Uuid,
        text: &str,
        max_message_bytes: usize,
    ) -> AppResult<Message> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("message text must not be empty".into()));
        }
        if text.len() > max_message_bytes {
            return Err(AppError::Validation(format!(
                "message text exceeds {max_message_bytes} bytes"
            )));
        }

        ConversationService::load_for_participant(store, conversation_id, author).await?;

        let row = store
            .insert_message(NewMessage {
                conversation_id,
                sender_id: author,
                content: text.to_string(),
            })
            .await?;

        let topic = TopicResolver::resolve(conversation_id);
        match MessageBroadcast::from_row(&row).to_json() {
            Ok(payload) => {
                // Best-effort: the committed row stands even when the
                // notification is lost, and no retry is attempted.
                if let Err(e) = backbone.publish(&topic, &payload).await {
                    tracing::warn!(
                        message_id = %row.id,
                        topic = %topic,
                        error = %e,
                        "message committed but broadcast failed"
                    );
                }
            }
            Err(e) => {
                tracing::error!(message_id = %row.id, error = %e, "broadcast serialization failed");
            }
        }

        Ok(row)
    }
}
