use std::sync::Arc;

use axum::{
    Json, Router, middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::require_auth;
use crate::rate_limit::{RateLimiter, limit_requests};
use crate::security::{cors_layer, security_headers};
use crate::state::AppState;
use crate::{auth, boards, todos};

/// Assembles the full application: `/api/*` routes, health check, and the
/// cross-cutting layers (rate limit, hardening headers, CORS, tracing).
pub fn router(state: AppState, config: &Config) -> anyhow::Result<Router> {
    let limiter = Arc::new(RateLimiter::new(config.rate_limit));

    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    // GET /todos/{id} takes a board id; PUT/DELETE take a todo id.
    let protected_routes = Router::new()
        .route("/boards", post(boards::create_board).get(boards::list_boards))
        .route(
            "/boards/{id}",
            put(boards::update_board).delete(boards::delete_board),
        )
        .route("/boards/{id}/progress", get(boards::board_progress))
        .route("/todos", post(todos::create_todo))
        .route(
            "/todos/{id}",
            get(todos::list_todos)
                .put(todos::update_todo)
                .delete(todos::delete_todo),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new().merge(public_routes).merge(protected_routes);

    let app = Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(limiter, limit_requests))
        .layer(middleware::from_fn(security_headers))
        .layer(cors_layer(&config.frontend_url)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
