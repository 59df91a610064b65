use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Workflow;

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Workflow>, sqlx::Error> {
    sqlx::query_as::<_, Workflow>("SELECT * FROM workflows WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Mark a workflow cancelled. Returns false if it was already cancelled or
/// does not exist.
pub async fn cancel(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE workflows SET status = 'cancelled'
         WHERE id = $1 AND status <> 'cancelled'",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() > 0)
}
