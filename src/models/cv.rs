use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A stored CV. Parsing happens upstream; the worker only reads
/// `parsed_data` and treats a missing or null value as a permanent error.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Cv {
    pub id: Uuid,
    pub user_id: Uuid,
    pub parsed_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
