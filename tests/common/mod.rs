use chat_service::{
    config::Config,
    state::AppState,
    websocket::{router::DeliveryRouter, ConnectionRegistry},
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Connects to the database named by DATABASE_URL and applies migrations.
/// Tests using this helper are #[ignore]d; run them against a disposable
/// database with `cargo test -- --ignored`.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to test database");
    chat_service::migrations::run_all(&pool)
        .await
        .expect("apply migrations");
    pool
}

/// Full application state over a real pool. The redis endpoint is
/// intentionally unreachable: publishes fail soft and local registry
/// delivery is what the tests observe.
pub fn test_state(pool: PgPool) -> AppState {
    let registry = ConnectionRegistry::new();
    let redis = redis::Client::open("redis://127.0.0.1:1/").expect("redis client");
    let router = DeliveryRouter::new(registry.clone(), redis);
    AppState::new(pool, Arc::new(Config::test_defaults()), registry, router)
}

pub async fn create_user(pool: &PgPool, prefix: &str) -> Uuid {
    let id = Uuid::new_v4();
    let username = format!("{prefix}-{}", &id.to_string()[..8]);
    sqlx::query("INSERT INTO users (id, username, password_hash) VALUES ($1, $2, 'x')")
        .bind(id)
        .bind(username)
        .execute(pool)
        .await
        .expect("insert user");
    id
}

pub async fn set_private(pool: &PgPool, user_id: Uuid) {
    sqlx::query("UPDATE users SET is_private = TRUE WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("set private");
}

pub async fn set_bio(pool: &PgPool, user_id: Uuid, bio: &str) {
    sqlx::query("UPDATE users SET bio = $2 WHERE id = $1")
        .bind(user_id)
        .bind(bio)
        .execute(pool)
        .await
        .expect("set bio");
}
