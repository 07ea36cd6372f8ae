//! In-memory store and loopback backbone for hermetic integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use uuid::Uuid;

use chat_relay_service::backbone::PubSubBackbone;
use chat_relay_service::error::{AppError, AppResult};
use chat_relay_service::models::conversation::Conversation;
use chat_relay_service::models::message::Message;
use chat_relay_service::services::message_service::MessageService;
use chat_relay_service::store::{ChatStore, NewMessage};
use chat_relay_service::topic::Topic;
use chat_relay_service::websocket::dispatch::DeliveryDispatcher;
use chat_relay_service::websocket::message_types::WsOutboundEvent;
use chat_relay_service::websocket::subscriptions::{ChannelSubscriptionManager, SubscriptionTable};
use chat_relay_service::websocket::{ConnectionId, ConnectionRegistry};

pub const MAX_MESSAGE_BYTES: usize = 8192;

/// `ChatStore` backed by plain maps, with switchable insert failure.
#[derive(Default)]
pub struct MemoryStore {
    conversations: Mutex<HashMap<Uuid, Conversation>>,
    messages: Mutex<Vec<Message>>,
    fail_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn seed_conversation(&self, participant_a: Uuid, participant_b: Uuid) -> Uuid {
        let conv = Conversation {
            id: Uuid::new_v4(),
            participant_a,
            participant_b,
            created_at: Utc::now(),
        };
        let id = conv.id;
        self.conversations.lock().unwrap().insert(id, conv);
        id
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn fail_next_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn create_conversation(
        &self,
        participant_a: Uuid,
        participant_b: Uuid,
    ) -> AppResult<Conversation> {
        let conv = Conversation {
            id: Uuid::new_v4(),
            participant_a,
            participant_b,
            created_at: Utc::now(),
        };
        self.conversations
            .lock()
            .unwrap()
            .insert(conv.id, conv.clone());
        Ok(conv)
    }

    async fn conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        Ok(self.conversations.lock().unwrap().get(&id).cloned())
    }

    async fn insert_message(&self, message: NewMessage) -> AppResult<Message> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let row = Message {
            id: Uuid::new_v4(),
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            content: message.content,
            created_at: Utc::now(),
        };
        self.messages.lock().unwrap().push(row.clone());
        Ok(row)
    }
}

/// Loopback `PubSubBackbone`: a publish is delivered straight to this
/// process's dispatcher, but only for topics the process subscribed to,
/// mirroring the production transport's interest semantics.
pub struct LocalBackbone {
    dispatcher: DeliveryDispatcher,
    interests: Mutex<HashSet<Topic>>,
    publish_count: AtomicUsize,
    fail_publish: AtomicBool,
    fail_subscribe: AtomicBool,
}

impl LocalBackbone {
    pub fn new(dispatcher: DeliveryDispatcher) -> Self {
        Self {
            dispatcher,
            interests: Mutex::new(HashSet::new()),
            publish_count: AtomicUsize::new(0),
            fail_publish: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
        }
    }

    pub fn publish_count(&self) -> usize {
        self.publish_count.load(Ordering::SeqCst)
    }

    pub fn has_interest(&self, topic: &Topic) -> bool {
        self.interests.lock().unwrap().contains(topic)
    }

    pub fn fail_next_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next_subscribes(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PubSubBackbone for LocalBackbone {
    async fn publish(&self, topic: &Topic, payload: &str) -> AppResult<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(AppError::BackboneUnavailable("loopback down".into()));
        }
        self.publish_count.fetch_add(1, Ordering::SeqCst);
        if self.has_interest(topic) {
            self.dispatcher.notify(topic, payload).await;
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &Topic) -> AppResult<()> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(AppError::BackboneUnavailable("loopback down".into()));
        }
        self.interests.lock().unwrap().insert(topic.clone());
        Ok(())
    }

    async fn unsubscribe(&self, topic: &Topic) -> AppResult<()> {
        self.interests.lock().unwrap().remove(topic);
        Ok(())
    }
}

/// Full in-process wiring minus the HTTP and socket layers.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub backbone: Arc<LocalBackbone>,
    pub registry: ConnectionRegistry,
    pub subscriptions: ChannelSubscriptionManager,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let registry = ConnectionRegistry::new();
        let table = SubscriptionTable::new();
        let dispatcher = DeliveryDispatcher::new(table.clone());
        let backbone = Arc::new(LocalBackbone::new(dispatcher));
        let subscriptions = ChannelSubscriptionManager::new(
            store.clone(),
            backbone.clone(),
            registry.clone(),
            table,
        );
        Self {
            store,
            backbone,
            registry,
            subscriptions,
        }
    }

    /// Register a connection for `identity` and hand back its outbound queue.
    pub async fn connect(&self, identity: Uuid) -> (ConnectionId, UnboundedReceiver<WsOutboundEvent>) {
        let (tx, rx) = unbounded_channel();
        let id = self
            .registry
            .register(Some(identity), tx)
            .await
            .expect("registration with identity succeeds");
        (id, rx)
    }

    pub async fn send_message(
        &self,
        author: Uuid,
        conversation_id: Uuid,
        text: &str,
    ) -> AppResult<Message> {
        MessageService::create_message(
            self.store.as_ref(),
            self.backbone.as_ref(),
            author,
            conversation_id,
            text,
            MAX_MESSAGE_BYTES,
        )
        .await
    }
}

/// Drain everything currently queued for a connection.
pub fn drain(rx: &mut UnboundedReceiver<WsOutboundEvent>) -> Vec<WsOutboundEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
