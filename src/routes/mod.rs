use crate::state::AppState;
use crate::websocket::handlers::ws_handler;
use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

pub mod users;
use users::{get_sidebar, search_users, update_profile};

pub fn build_router(state: AppState) -> Router {
    // REST surface behind bearer-token middleware.
    let api_v1 = Router::new()
        .route("/users", get(get_sidebar))
        .route("/users/search", get(search_users))
        .route("/users/me", patch(update_profile))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ))
        // The websocket endpoint authenticates inside the upgrade handler
        // (browsers cannot set headers on a websocket handshake).
        .route("/ws", get(ws_handler));

    let router = Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api/v1", api_v1)
        .with_state(state);

    crate::middleware::logging::add_tracing(router)
}
