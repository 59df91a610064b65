use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QueueItem {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub user_id: Uuid,
    pub cv_id: Uuid,
    pub job_id: Option<Uuid>,
    pub job_external_id: String,
    pub status: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub next_run_at: DateTime<Utc>,
    pub priority: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Job snapshot captured at enqueue time. Later mutations of the job a
/// workflow was built from must not affect in-flight items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub title: String,
    pub company: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_context: Option<String>,
}
