use std::sync::Arc;

use tower_http::cors::CorsLayer;

use chat_relay_service::backbone::RedisBackbone;
use chat_relay_service::config::Config;
use chat_relay_service::error::AppError;
use chat_relay_service::state::AppState;
use chat_relay_service::store::PgStore;
use chat_relay_service::websocket::dispatch::DeliveryDispatcher;
use chat_relay_service::websocket::subscriptions::{ChannelSubscriptionManager, SubscriptionTable};
use chat_relay_service::websocket::ConnectionRegistry;
use chat_relay_service::{db, logging, middleware, migrations, routes};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    logging::init_tracing();

    let config = Arc::new(Config::from_env()?);

    let pool = db::init_pool(&config.database_url).await?;
    migrations::run_all(&pool).await?;
    tracing::info!("database ready");

    let store = Arc::new(PgStore::new(pool));
    let registry = ConnectionRegistry::new();

    // The subscription table is shared between the manager (which writes it on
    // subscribe/unsubscribe) and the dispatcher (which reads it to fan out).
    let table = SubscriptionTable::new();
    let dispatcher = DeliveryDispatcher::new(table.clone());

    let backbone = Arc::new(RedisBackbone::connect(&config.redis_url, dispatcher).await?);
    tracing::info!("pubsub backbone connected");

    let subscriptions = ChannelSubscriptionManager::new(
        store.clone(),
        backbone.clone(),
        registry.clone(),
        table,
    );

    let state = AppState {
        store,
        registry,
        subscriptions,
        backbone,
        config: config.clone(),
    };

    let app = middleware::logging::add_tracing(routes::router())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::StartServer(e.to_string()))?;
    tracing::info!(%addr, "chat relay service listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::StartServer(e.to_string()))?;

    Ok(())
}
