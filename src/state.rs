use crate::{
    backbone::PubSubBackbone,
    config::Config,
    store::ChatStore,
    websocket::{subscriptions::ChannelSubscriptionManager, ConnectionRegistry},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub registry: ConnectionRegistry,
    pub subscriptions: ChannelSubscriptionManager,
    pub backbone: Arc<dyn PubSubBackbone>,
    pub config: Arc<Config>,
}
