use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Application;

/// Record a successful submission. Application rows exist only for terminal
/// outcomes and are append-only from the worker's perspective.
pub async fn insert_submitted(
    pool: &PgPool,
    user_id: Uuid,
    job_external_id: &str,
    cover_letter: &str,
    response_data: &serde_json::Value,
    external_resume_id: Option<&str>,
    external_negotiation_id: Option<&str>,
) -> Result<Application, sqlx::Error> {
    sqlx::query_as::<_, Application>(
        "INSERT INTO applications
             (user_id, job_external_id, status, submitted_at, cover_letter,
              response_data, external_resume_id, external_negotiation_id)
         VALUES ($1, $2, 'submitted', now(), $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(user_id)
    .bind(job_external_id)
    .bind(cover_letter)
    .bind(response_data)
    .bind(external_resume_id)
    .bind(external_negotiation_id)
    .fetch_one(pool)
    .await
}

/// Record a permanent failure.
pub async fn insert_failed(
    pool: &PgPool,
    user_id: Uuid,
    job_external_id: &str,
    error_message: &str,
) -> Result<Application, sqlx::Error> {
    sqlx::query_as::<_, Application>(
        "INSERT INTO applications (user_id, job_external_id, status, error_message)
         VALUES ($1, $2, 'failed', $3)
         RETURNING *",
    )
    .bind(user_id)
    .bind(job_external_id)
    .bind(error_message)
    .fetch_one(pool)
    .await
}

/// Count a user's applications created within the last `minutes`.
pub async fn count_in_window(
    pool: &PgPool,
    user_id: Uuid,
    minutes: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM applications
         WHERE user_id = $1
           AND created_at >= now() - make_interval(mins => $2::int)",
    )
    .bind(user_id)
    .bind(minutes as i32)
    .fetch_one(pool)
    .await
}

pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Application>, sqlx::Error> {
    sqlx::query_as::<_, Application>(
        "SELECT * FROM applications WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
