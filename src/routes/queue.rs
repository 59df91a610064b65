use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::ApiKey;
use crate::db;
use crate::db::queue::NewJob;
use crate::error::AppError;
use crate::models::queue_item::JobPayload;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct EnqueueRequest {
    pub user_id: Uuid,
    pub cv_id: Uuid,
    pub jobs: Vec<EnqueueJob>,
}

#[derive(Deserialize)]
pub struct EnqueueJob {
    pub job_external_id: String,
    #[serde(default)]
    pub job_id: Option<Uuid>,
    pub title: String,
    pub company: String,
    pub description: String,
    #[serde(default)]
    pub search_context: Option<String>,
    #[serde(default)]
    pub priority: i32,
}

pub async fn enqueue(
    _auth: ApiKey,
    State(state): State<SharedState>,
    Json(req): Json<EnqueueRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.jobs.is_empty() {
        return Err(AppError::BadRequest("jobs must not be empty".to_string()));
    }

    db::cvs::find_for_user(&state.pool, req.cv_id, req.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("CV not found".to_string()))?;

    let jobs: Vec<NewJob> = req
        .jobs
        .into_iter()
        .map(|j| NewJob {
            job_external_id: j.job_external_id,
            job_id: j.job_id,
            priority: j.priority,
            payload: JobPayload {
                title: j.title,
                company: j.company,
                description: j.description,
                search_context: j.search_context,
            },
        })
        .collect();

    let (workflow_id, queued) =
        db::queue::enqueue_workflow(&state.pool, req.user_id, req.cv_id, &jobs).await?;

    Ok(Json(json!({ "workflow_id": workflow_id, "queued": queued })))
}

pub async fn workflow_status(
    _auth: ApiKey,
    State(state): State<SharedState>,
    Path(workflow_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let workflow = db::workflows::find_by_id(&state.pool, workflow_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Workflow not found".to_string()))?;

    let counts = db::queue::workflow_status_counts(&state.pool, workflow_id).await?;
    let items = db::queue::list_by_workflow(&state.pool, workflow_id).await?;

    Ok(Json(json!({
        "workflow": workflow,
        "counts": counts.into_iter().collect::<std::collections::HashMap<_, _>>(),
        "items": items,
    })))
}

pub async fn cancel_workflow(
    _auth: ApiKey,
    State(state): State<SharedState>,
    Path(workflow_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    db::workflows::find_by_id(&state.pool, workflow_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Workflow not found".to_string()))?;

    // Mark the workflow first so claims stop, then sweep the queued items.
    db::workflows::cancel(&state.pool, workflow_id).await?;
    let cancelled = db::queue::cancel_pending(&state.pool, workflow_id).await?;

    tracing::info!(%workflow_id, cancelled, "workflow cancelled");
    Ok(Json(json!({ "workflow_id": workflow_id, "cancelled_items": cancelled })))
}

pub async fn remove_item(
    _auth: ApiKey,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    db::queue::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Queue item not found".to_string()))?;

    if !db::queue::remove(&state.pool, id).await? {
        return Err(AppError::Conflict(
            "Item already claimed or finished".to_string(),
        ));
    }

    Ok(Json(json!({ "message": "Removed" })))
}

pub async fn stats(
    _auth: ApiKey,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let counts = db::queue::global_status_counts(&state.pool).await?;
    Ok(Json(json!({
        "counts": counts.into_iter().collect::<std::collections::HashMap<_, _>>(),
    })))
}
