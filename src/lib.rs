pub mod auth;
pub mod breaker;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod retry;
pub mod routes;
pub mod state;
pub mod worker;

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::breaker::CircuitBreaker;
use crate::clients::ai::AiClient;
use crate::clients::core::CoreClient;
use crate::config::Config;
use crate::state::{AppState, SharedState};

pub fn build_app(pool: PgPool, config: Config) -> (Router, SharedState) {
    let ai = Arc::new(AiClient::new(&config.ai));
    let core = Arc::new(CoreClient::new(&config.core));
    let breaker = CircuitBreaker::new("core-submit", config.breaker.clone());

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        ai,
        core,
        breaker,
    });

    let app = Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    (app, state)
}

async fn health() -> &'static str {
    "ok"
}
