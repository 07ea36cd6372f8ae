//! Fan-out of backbone notifications to locally subscribed connections.

use crate::models::message::MessageBroadcast;
use crate::topic::Topic;
use crate::websocket::message_types::WsOutboundEvent;
use crate::websocket::subscriptions::SubscriptionTable;

/// Pushes one backbone notification onto every subscribed connection's
/// outbound queue.
///
/// Delivery is live/ephemeral: a connection that went away between lookup and
/// delivery is pruned and skipped, and one dead queue never affects the rest.
/// The author's own subscribed connections receive the broadcast like any
/// other subscriber.
#[derive(Clone)]
pub struct DeliveryDispatcher {
    table: SubscriptionTable,
}

impl DeliveryDispatcher {
    pub fn new(table: SubscriptionTable) -> Self {
        Self { table }
    }

    /// Handle one notification from the backbone. Returns the number of
    /// connections the event was enqueued for.
    pub async fn notify(&self, topic: &Topic, payload: &str) -> usize {
        let broadcast = match MessageBroadcast::from_json(payload) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "dropping malformed backbone payload");
                return 0;
            }
        };
        let event = WsOutboundEvent::from_broadcast(broadcast);

        let mut guard = self.table.inner.write().await;
        let Some(subscribers) = guard.get_mut(topic) else {
            return 0;
        };

        let before = subscribers.len();
        // Send to every subscriber, pruning queues whose connection is gone.
        subscribers.retain(|_, entry| entry.outbound.send(event.clone()).is_ok());
        let delivered = subscribers.len();

        if delivered < before {
            tracing::debug!(
                topic = %topic,
                pruned = before - delivered,
                "pruned dead subscribers during fan-out"
            );
        }
        if subscribers.is_empty() {
            guard.remove(topic);
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backbone::PubSubBackbone;
    use crate::error::AppResult;
    use crate::models::conversation::Conversation;
    use crate::models::message::Message;
    use crate::store::{ChatStore, NewMessage};
    use crate::topic::TopicResolver;
    use crate::websocket::subscriptions::ChannelSubscriptionManager;
    use crate::websocket::ConnectionRegistry;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Arc;
    use uuid::Uuid;

    struct NullBackbone;

    #[async_trait]
    impl PubSubBackbone for NullBackbone {
        async fn publish(&self, _topic: &Topic, _payload: &str) -> AppResult<()> {
            Ok(())
        }
        async fn subscribe(&self, _topic: &Topic) -> AppResult<()> {
            Ok(())
        }
        async fn unsubscribe(&self, _topic: &Topic) -> AppResult<()> {
            Ok(())
        }
    }

    struct FixedStore {
        conversation: Conversation,
    }

    #[async_trait]
    impl ChatStore for FixedStore {
        async fn create_conversation(&self, _a: Uuid, _b: Uuid) -> AppResult<Conversation> {
            unimplemented!()
        }
        async fn conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
            Ok((self.conversation.id == id).then(|| self.conversation.clone()))
        }
        async fn insert_message(&self, _m: NewMessage) -> AppResult<Message> {
            unimplemented!()
        }
    }

    fn sample_payload(conversation_id: Uuid, author_id: Uuid, text: &str) -> String {
        MessageBroadcast {
            message_id: Uuid::new_v4(),
            conversation_id,
            author_id,
            text: text.into(),
            created_at: Utc::now(),
        }
        .to_json()
        .unwrap()
    }

    #[tokio::test]
    async fn delivers_to_subscribers_and_prunes_dead_queues() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            participant_a: alice,
            participant_b: bob,
            created_at: Utc::now(),
        };
        let conversation_id = conversation.id;
        let topic = TopicResolver::resolve(conversation_id);

        let registry = ConnectionRegistry::new();
        let table = SubscriptionTable::new();
        let manager = ChannelSubscriptionManager::new(
            Arc::new(FixedStore { conversation }),
            Arc::new(NullBackbone),
            registry.clone(),
            table.clone(),
        );
        let dispatcher = DeliveryDispatcher::new(table);

        let (alice_tx, mut alice_rx) = tokio::sync::mpsc::unbounded_channel();
        let (bob_tx, bob_rx) = tokio::sync::mpsc::unbounded_channel();
        let alice_conn = registry.register(Some(alice), alice_tx).await.unwrap();
        let bob_conn = registry.register(Some(bob), bob_tx).await.unwrap();
        manager.subscribe(alice_conn, conversation_id).await.unwrap();
        manager.subscribe(bob_conn, conversation_id).await.unwrap();

        // Bob's read side goes away mid-flight.
        drop(bob_rx);

        let delivered = dispatcher
            .notify(&topic, &sample_payload(conversation_id, alice, "hello"))
            .await;
        assert_eq!(delivered, 1);

        match alice_rx.try_recv().unwrap() {
            WsOutboundEvent::MessageNew { text, author_id, .. } => {
                assert_eq!(text, "hello");
                assert_eq!(author_id, alice);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // Bob's stale entry was pruned during fan-out.
        assert_eq!(manager.local_subscriber_count(conversation_id).await, 1);
    }

    #[tokio::test]
    async fn unknown_topic_and_malformed_payload_deliver_nothing() {
        let dispatcher = DeliveryDispatcher::new(SubscriptionTable::new());
        let topic = TopicResolver::resolve(Uuid::new_v4());

        assert_eq!(
            dispatcher
                .notify(&topic, &sample_payload(Uuid::new_v4(), Uuid::new_v4(), "x"))
                .await,
            0
        );
        assert_eq!(dispatcher.notify(&topic, "not json").await, 0);
    }
}
