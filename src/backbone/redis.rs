//! Redis pub/sub adapter.
//!
//! Publishes through a multiplexed `ConnectionManager`; per-topic interest
//! runs over a dedicated pub/sub connection split into a command sink (driven
//! by a control channel) and a notification stream (fed into the
//! `DeliveryDispatcher`).

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::{ConnectionManager, PubSubSink, PubSubStream};
use redis::{AsyncCommands, Client};
use tokio::sync::{mpsc, oneshot};

use crate::error::{AppError, AppResult};
use crate::topic::Topic;
use crate::websocket::dispatch::DeliveryDispatcher;

use super::PubSubBackbone;

enum InterestOp {
    Subscribe,
    Unsubscribe,
}

struct InterestCommand {
    op: InterestOp,
    topic: Topic,
    ack: oneshot::Sender<AppResult<()>>,
}

pub struct RedisBackbone {
    publisher: ConnectionManager,
    control: mpsc::UnboundedSender<InterestCommand>,
}

impl RedisBackbone {
    /// Connect and spawn the interest and notification loops.
    pub async fn connect(redis_url: &str, dispatcher: DeliveryDispatcher) -> AppResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AppError::BackboneUnavailable(format!("redis url: {e}")))?;
        let publisher = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| AppError::BackboneUnavailable(format!("redis connect: {e}")))?;
        // Pub/sub requires its own connection, not the multiplexed one.
        let pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| AppError::BackboneUnavailable(format!("redis pubsub: {e}")))?;
        let (sink, stream) = pubsub.split();

        let (control, control_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_interest_loop(sink, control_rx));
        tokio::spawn(run_notify_loop(stream, dispatcher));

        Ok(Self { publisher, control })
    }

    async fn send_interest(&self, op: InterestOp, topic: &Topic) -> AppResult<()> {
        let (ack, confirmed) = oneshot::channel();
        self.control
            .send(InterestCommand {
                op,
                topic: topic.clone(),
                ack,
            })
            .map_err(|_| AppError::BackboneUnavailable("interest loop stopped".into()))?;
        confirmed
            .await
            .map_err(|_| AppError::BackboneUnavailable("interest loop stopped".into()))?
    }
}

#[async_trait]
impl PubSubBackbone for RedisBackbone {
    async fn publish(&self, topic: &Topic, payload: &str) -> AppResult<()> {
        let mut conn = self.publisher.clone();
        conn.publish::<_, _, ()>(topic.channel(), payload)
            .await
            .map_err(|e| AppError::BackboneUnavailable(format!("publish: {e}")))
    }

    async fn subscribe(&self, topic: &Topic) -> AppResult<()> {
        self.send_interest(InterestOp::Subscribe, topic).await
    }

    async fn unsubscribe(&self, topic: &Topic) -> AppResult<()> {
        self.send_interest(InterestOp::Unsubscribe, topic).await
    }
}

async fn run_interest_loop(
    mut sink: PubSubSink,
    mut commands: mpsc::UnboundedReceiver<InterestCommand>,
) {
    while let Some(cmd) = commands.recv().await {
        let channel = cmd.topic.channel();
        let result = match cmd.op {
            InterestOp::Subscribe => sink.subscribe(&channel).await,
            InterestOp::Unsubscribe => sink.unsubscribe(&channel).await,
        }
        .map_err(|e| AppError::BackboneUnavailable(format!("interest: {e}")));

        // Caller may have been cancelled; a dropped ack is fine.
        let _ = cmd.ack.send(result);
    }
}

async fn run_notify_loop(mut stream: PubSubStream, dispatcher: DeliveryDispatcher) {
    while let Some(msg) = stream.next().await {
        let channel = msg.get_channel_name().to_string();
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(%channel, error = %e, "unreadable backbone payload");
                continue;
            }
        };

        match Topic::from_channel(&channel) {
            Some(topic) => {
                dispatcher.notify(&topic, &payload).await;
            }
            None => {
                tracing::debug!(%channel, "ignoring notification outside conversation namespace");
            }
        }
    }
    tracing::warn!("backbone notification stream ended");
}
