pub mod queue;

use axum::Router;
use axum::routing::{delete, get, post};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/v1/applications/queue", post(queue::enqueue))
        .route("/api/v1/applications/queue/stats", get(queue::stats))
        .route(
            "/api/v1/applications/queue/{workflow_id}",
            get(queue::workflow_status),
        )
        .route(
            "/api/v1/applications/queue/{workflow_id}/cancel",
            post(queue::cancel_workflow),
        )
        .route(
            "/api/v1/applications/queue/items/{id}",
            delete(queue::remove_item),
        )
}
