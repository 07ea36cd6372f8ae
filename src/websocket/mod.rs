use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, RwLock};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::websocket::message_types::WsOutboundEvent;

pub mod dispatch;
pub mod handlers;
pub mod message_types;
pub mod subscriptions;

/// Unique identifier for one live transport connection.
///
/// Assigned at registration time so disconnect cleanup can target exactly the
/// entries this connection created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

struct RegisteredConnection {
    identity: Uuid,
    outbound: UnboundedSender<WsOutboundEvent>,
}

/// Tracks live connections and the identity each one authenticated as.
///
/// The outbound sender stored here is the head of the connection's own write
/// queue; everything pushed to a connection goes through it.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<ConnectionId, RegisteredConnection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under its authenticated identity.
    ///
    /// Fails `Unauthenticated` when the transport handshake carried no
    /// identity.
    pub async fn register(
        &self,
        identity: Option<Uuid>,
        outbound: UnboundedSender<WsOutboundEvent>,
    ) -> AppResult<ConnectionId> {
        let identity = identity.ok_or(AppError::Unauthenticated)?;
        let id = ConnectionId::new();

        let mut guard = self.inner.write().await;
        guard.insert(id, RegisteredConnection { identity, outbound });

        tracing::debug!(connection = %id, %identity, total = guard.len(), "connection registered");
        Ok(id)
    }

    pub async fn identity(&self, connection: ConnectionId) -> Option<Uuid> {
        let guard = self.inner.read().await;
        guard.get(&connection).map(|c| c.identity)
    }

    pub async fn outbound(&self, connection: ConnectionId) -> Option<UnboundedSender<WsOutboundEvent>> {
        let guard = self.inner.read().await;
        guard.get(&connection).map(|c| c.outbound.clone())
    }

    /// Remove a connection. Idempotent; unknown ids are a no-op.
    pub async fn deregister(&self, connection: ConnectionId) {
        let mut guard = self.inner.write().await;
        if guard.remove(&connection).is_some() {
            tracing::debug!(connection = %connection, remaining = guard.len(), "connection deregistered");
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn register_requires_identity() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = unbounded_channel();

        let err = registry.register(None, tx).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn deregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = unbounded_channel();
        let identity = Uuid::new_v4();

        let conn = registry.register(Some(identity), tx).await.unwrap();
        assert_eq!(registry.identity(conn).await, Some(identity));

        registry.deregister(conn).await;
        registry.deregister(conn).await;
        assert_eq!(registry.identity(conn).await, None);
        assert_eq!(registry.connection_count().await, 0);
    }
}
