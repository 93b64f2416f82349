use chat_service::{
    config::Config,
    db, error, logging, migrations, routes,
    state::AppState,
    websocket::{pubsub, router::DeliveryRouter, ConnectionRegistry},
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(Config::from_env()?);

    let db = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    // Schema must be in sync before we accept a single connection.
    migrations::run_all(&db)
        .await
        .map_err(|e| error::AppError::StartServer(format!("migrations: {e}")))?;

    let redis = redis::Client::open(cfg.redis_url.as_str())
        .map_err(|e| error::AppError::StartServer(format!("redis: {e}")))?;

    let registry = ConnectionRegistry::new();
    let router = DeliveryRouter::new(registry.clone(), redis.clone());
    let origin = router.origin();
    let state = AppState::new(db, cfg.clone(), registry.clone(), router);

    // Cross-instance fan-out listener.
    tokio::spawn(async move {
        if let Err(e) = pubsub::start_psub_listener(redis, registry, origin).await {
            tracing::error!(error = %e, "redis pubsub listener failed");
        }
    });

    let app = routes::build_router(state);
    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting chat-service");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    Ok(())
}
