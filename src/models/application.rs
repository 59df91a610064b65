use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Application {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_external_id: String,
    pub status: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub cover_letter: Option<String>,
    pub response_data: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub external_resume_id: Option<String>,
    pub external_negotiation_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
