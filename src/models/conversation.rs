use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable two-party conversation.
///
/// Schema note: no uniqueness constraint on the participant pair — duplicate
/// conversations between the same two identities are allowed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, identity: Uuid) -> bool {
        self.participant_a == identity || self.participant_b == identity
    }
}
