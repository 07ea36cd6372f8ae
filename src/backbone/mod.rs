//! Cross-process publish/subscribe transport contract.
//!
//! The backbone is an explicitly constructed handle passed into
//! `MessageService` and the subscription manager — never a process-wide
//! global. Production uses Redis pub/sub; tests substitute a loopback.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::topic::Topic;

mod redis;

pub use redis::RedisBackbone;

/// Process-granularity pub/sub. `publish` is best-effort, at-least-once to
/// currently subscribed processes; same-topic notifications from one
/// publisher arrive in publish order.
#[async_trait]
pub trait PubSubBackbone: Send + Sync {
    async fn publish(&self, topic: &Topic, payload: &str) -> AppResult<()>;

    /// Register this process's interest in a topic.
    async fn subscribe(&self, topic: &Topic) -> AppResult<()>;

    /// Drop this process's interest in a topic.
    async fn unsubscribe(&self, topic: &Topic) -> AppResult<()>;
}
