//! Live (connection, topic) subscription tracking.
//!
//! The topic table here is the single shared structure between this manager
//! (writer) and the `DeliveryDispatcher` (reader): fan-out and lifecycle
//! changes synchronize on its lock, so dispatch never observes a half-updated
//! subscriber set.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, Mutex, RwLock};
use uuid::Uuid;

use crate::backbone::PubSubBackbone;
use crate::error::{AppError, AppResult};
use crate::store::ChatStore;
use crate::topic::{Topic, TopicResolver};
use crate::websocket::message_types::WsOutboundEvent;
use crate::websocket::{ConnectionId, ConnectionRegistry};

/// Lifecycle of one (connection, topic) subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Backbone registration in flight.
    Pending,
    /// Confirmed; the connection is a fan-out target for the topic.
    Active,
    /// Unsubscribed, disconnected, or backbone registration failed.
    Closed,
}

/// What `subscribe` hands back to the caller.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    pub topic: Topic,
    pub state: SubscriptionState,
}

pub(crate) struct SubscriptionEntry {
    pub(crate) state: SubscriptionState,
    pub(crate) outbound: UnboundedSender<WsOutboundEvent>,
}

/// The local (connection, topic) table, shared by the subscription manager
/// (writer) and the `DeliveryDispatcher` (reader). Constructed once at boot
/// and handed to both.
#[derive(Default, Clone)]
pub struct SubscriptionTable {
    pub(crate) inner: Arc<RwLock<HashMap<Topic, HashMap<ConnectionId, SubscriptionEntry>>>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Authorizes and tracks subscriptions; owns process-level backbone interest.
#[derive(Clone)]
pub struct ChannelSubscriptionManager {
    store: Arc<dyn ChatStore>,
    backbone: Arc<dyn PubSubBackbone>,
    registry: ConnectionRegistry,
    table: SubscriptionTable,
    // Serializes every interest transition: the table mutation and the
    // backbone round-trip it implies happen as one unit. Without this, a
    // deregistration decided for the old last subscriber could land on the
    // backbone after a fresh subscriber re-registered, leaving an Active
    // subscription with no process-level interest behind it.
    interest: Arc<Mutex<()>>,
}

impl ChannelSubscriptionManager {
    pub fn new(
        store: Arc<dyn ChatStore>,
        backbone: Arc<dyn PubSubBackbone>,
        registry: ConnectionRegistry,
        table: SubscriptionTable,
    ) -> Self {
        Self {
            store,
            backbone,
            registry,
            table,
            interest: Arc::new(Mutex::new(())),
        }
    }

    /// Subscribe a registered connection to a conversation's topic.
    ///
    /// Fails `NotFound` when the conversation does not exist and `Forbidden`
    /// when the connection's identity is not one of its two participants.
    /// A duplicate subscribe from the same connection is a no-op returning the
    /// existing state.
    pub async fn subscribe(
        &self,
        connection: ConnectionId,
        conversation_id: Uuid,
    ) -> AppResult<SubscriptionHandle> {
        let identity = self
            .registry
            .identity(connection)
            .await
            .ok_or(AppError::Unauthenticated)?;
        let outbound = self
            .registry
            .outbound(connection)
            .await
            .ok_or(AppError::Unauthenticated)?;

        let conversation = self
            .store
            .conversation(conversation_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !conversation.has_participant(identity) {
            return Err(AppError::Forbidden);
        }

        let topic = TopicResolver::resolve(conversation_id);

        // Held across the table check and the backbone registration: a later
        // subscriber cannot be confirmed Active while an earlier registration
        // or deregistration for this topic is still in flight.
        let _interest = self.interest.lock().await;

        let first_local = {
            let mut guard = self.table.inner.write().await;
            let subscribers = guard.entry(topic.clone()).or_default();
            if let Some(existing) = subscribers.get(&connection) {
                return Ok(SubscriptionHandle {
                    topic,
                    state: existing.state,
                });
            }
            let first_local = subscribers.is_empty();
            subscribers.insert(
                connection,
                SubscriptionEntry {
                    state: SubscriptionState::Pending,
                    outbound,
                },
            );
            first_local
        };

        if first_local {
            if let Err(e) = self.backbone.subscribe(&topic).await {
                let mut guard = self.table.inner.write().await;
                if let Some(subscribers) = guard.get_mut(&topic) {
                    subscribers.remove(&connection);
                    if subscribers.is_empty() {
                        guard.remove(&topic);
                    }
                }
                tracing::warn!(topic = %topic, error = %e, "backbone registration failed");
                return Err(e);
            }
        }

        let mut guard = self.table.inner.write().await;
        match guard.get_mut(&topic).and_then(|s| s.get_mut(&connection)) {
            Some(entry) => {
                entry.state = SubscriptionState::Active;
                tracing::debug!(topic = %topic, connection = %connection, "subscription active");
                Ok(SubscriptionHandle {
                    topic,
                    state: SubscriptionState::Active,
                })
            }
            None => Ok(SubscriptionHandle {
                topic,
                state: SubscriptionState::Closed,
            }),
        }
    }

    /// Remove a connection's subscription to a conversation. Idempotent.
    ///
    /// When the last local subscriber for the topic goes away, process-level
    /// backbone interest is dropped best-effort: stale interest only costs an
    /// unrouted notification, never correctness.
    pub async fn unsubscribe(&self, connection: ConnectionId, conversation_id: Uuid) {
        let topic = TopicResolver::resolve(conversation_id);

        // Taken before the last-local decision so the eventual backbone
        // deregistration cannot land after a newer subscriber's registration.
        let _interest = self.interest.lock().await;

        let last_local = {
            let mut guard = self.table.inner.write().await;
            let Some(subscribers) = guard.get_mut(&topic) else {
                return;
            };
            if subscribers.remove(&connection).is_none() {
                return;
            }
            if subscribers.is_empty() {
                guard.remove(&topic);
                true
            } else {
                false
            }
        };

        if last_local {
            if let Err(e) = self.backbone.unsubscribe(&topic).await {
                tracing::warn!(topic = %topic, error = %e, "backbone deregistration failed");
            }
        }
        tracing::debug!(topic = %topic, connection = %connection, "subscription closed");
    }

    /// Remove every subscription a connection holds. Called on disconnect;
    /// idempotent like `unsubscribe`.
    pub async fn drop_connection(&self, connection: ConnectionId) {
        let _interest = self.interest.lock().await;

        let emptied: Vec<Topic> = {
            let mut guard = self.table.inner.write().await;
            let mut emptied = Vec::new();
            guard.retain(|topic, subscribers| {
                if subscribers.remove(&connection).is_some() && subscribers.is_empty() {
                    emptied.push(topic.clone());
                    return false;
                }
                true
            });
            emptied
        };

        for topic in emptied {
            if let Err(e) = self.backbone.unsubscribe(&topic).await {
                tracing::warn!(topic = %topic, error = %e, "backbone deregistration failed");
            }
        }
    }

    pub async fn is_subscribed(&self, connection: ConnectionId, conversation_id: Uuid) -> bool {
        let topic = TopicResolver::resolve(conversation_id);
        let guard = self.table.inner.read().await;
        guard
            .get(&topic)
            .map(|s| s.contains_key(&connection))
            .unwrap_or(false)
    }

    pub async fn local_subscriber_count(&self, conversation_id: Uuid) -> usize {
        let topic = TopicResolver::resolve(conversation_id);
        let guard = self.table.inner.read().await;
        guard.get(&topic).map(|s| s.len()).unwrap_or(0)
    }
}
