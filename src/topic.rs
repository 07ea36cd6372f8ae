//! Typed pub/sub routing keys.
//!
//! A `Topic` is only ever produced by `TopicResolver` (or recovered from a
//! backbone channel name), so routing keys cannot be assembled ad hoc from
//! string fragments elsewhere in the codebase.

use uuid::Uuid;

use crate::error::{AppError, AppResult};

const CHANNEL_PREFIX: &str = "conversation:";

/// Canonical routing key for one conversation's broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    conversation_id: Uuid,
}

impl Topic {
    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    /// Backbone channel name, e.g. `conversation:550e8400-e29b-...`.
    pub fn channel(&self) -> String {
        format!("{CHANNEL_PREFIX}{}", self.conversation_id)
    }

    /// Recover a topic from an inbound backbone channel name.
    ///
    /// Returns `None` for channels outside this service's namespace so the
    /// listener can skip them instead of faulting.
    pub fn from_channel(channel: &str) -> Option<Topic> {
        let rest = channel.strip_prefix(CHANNEL_PREFIX)?;
        let id = Uuid::parse_str(rest).ok()?;
        Some(TopicResolver::resolve(id))
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.channel())
    }
}

pub struct TopicResolver;

impl TopicResolver {
    /// Deterministic, injective mapping from conversation id to topic.
    pub fn resolve(conversation_id: Uuid) -> Topic {
        Topic { conversation_id }
    }

    /// Resolve from an untrusted string form of the conversation id.
    pub fn resolve_raw(conversation_id: &str) -> AppResult<Topic> {
        let id = Uuid::parse_str(conversation_id)
            .map_err(|_| AppError::InvalidIdentifier(conversation_id.to_string()))?;
        Ok(Self::resolve(id))
    }
}
