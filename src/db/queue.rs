use sqlx::PgPool;
use uuid::Uuid;

use crate::models::queue_item::{JobPayload, QueueItem};

/// One job to enqueue, snapshotted into the item payload.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_external_id: String,
    pub job_id: Option<Uuid>,
    pub priority: i32,
    pub payload: JobPayload,
}

/// Create a workflow and its queue items in one transaction.
/// Returns the workflow id and the number of items queued.
pub async fn enqueue_workflow(
    pool: &PgPool,
    user_id: Uuid,
    cv_id: Uuid,
    jobs: &[NewJob],
) -> Result<(Uuid, usize), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let workflow_id: Uuid = sqlx::query_scalar(
        "INSERT INTO workflows (user_id) VALUES ($1) RETURNING id",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    for job in jobs {
        let payload = serde_json::to_value(&job.payload)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query(
            "INSERT INTO application_queue
                 (workflow_id, user_id, cv_id, job_id, job_external_id, payload, priority)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(workflow_id)
        .bind(user_id)
        .bind(cv_id)
        .bind(job.job_id)
        .bind(&job.job_external_id)
        .bind(&payload)
        .bind(job.priority)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok((workflow_id, jobs.len()))
}

/// Atomically claim a batch of due items using SELECT FOR UPDATE SKIP LOCKED.
///
/// Concurrent claimers never receive the same row. Items of a cancelled
/// workflow are skipped here, so a backoff-rescheduled item cannot outlive
/// its workflow's cancellation.
pub async fn claim_batch(pool: &PgPool, limit: i64) -> Result<Vec<QueueItem>, sqlx::Error> {
    let mut items = sqlx::query_as::<_, QueueItem>(
        "UPDATE application_queue SET status = 'processing', updated_at = now()
         WHERE id IN (
             SELECT q.id FROM application_queue q
             JOIN workflows w ON w.id = q.workflow_id
             WHERE q.status IN ('pending', 'rate_limited')
               AND q.next_run_at <= now()
               AND w.status <> 'cancelled'
             ORDER BY q.priority DESC, q.next_run_at ASC
             LIMIT $1
             FOR UPDATE OF q SKIP LOCKED
         )
         RETURNING *",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    // RETURNING does not preserve the subquery's order.
    items.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(a.next_run_at.cmp(&b.next_run_at))
    });
    Ok(items)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<QueueItem>, sqlx::Error> {
    sqlx::query_as::<_, QueueItem>("SELECT * FROM application_queue WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_by_workflow(
    pool: &PgPool,
    workflow_id: Uuid,
) -> Result<Vec<QueueItem>, sqlx::Error> {
    sqlx::query_as::<_, QueueItem>(
        "SELECT * FROM application_queue WHERE workflow_id = $1 ORDER BY created_at ASC",
    )
    .bind(workflow_id)
    .fetch_all(pool)
    .await
}

pub async fn mark_submitted(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE application_queue
         SET status = 'submitted', last_error = NULL, updated_at = now()
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Terminal failure: either a permanent item error or an exhausted retry
/// budget. `attempts` is the caller's already-incremented count.
pub async fn mark_failed(
    pool: &PgPool,
    id: Uuid,
    attempts: i32,
    error: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE application_queue
         SET status = 'failed', attempts = $2, last_error = $3, updated_at = now()
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .bind(attempts)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}

/// Reschedule after a transient attempt failure with exponential backoff.
pub async fn reschedule_retry(
    pool: &PgPool,
    id: Uuid,
    attempts: i32,
    error: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE application_queue
         SET status = 'pending',
             attempts = $2,
             next_run_at = now() + make_interval(mins => $3::int),
             last_error = $4,
             updated_at = now()
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .bind(attempts)
    .bind(backoff_minutes(attempts) as i32)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}

/// Reschedule after a rate-limit rejection. Not the item's fault, so the
/// attempts counter is left untouched.
pub async fn reschedule_rate_limited(
    pool: &PgPool,
    id: Uuid,
    cooldown_minutes: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE application_queue
         SET status = 'rate_limited',
             next_run_at = now() + make_interval(mins => $2::int),
             last_error = 'rate_limited',
             updated_at = now()
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .bind(cooldown_minutes as i32)
    .execute(pool)
    .await?;
    Ok(())
}

/// Backoff schedule for attempt n: min(2^n, 60) minutes.
pub fn backoff_minutes(attempts: i32) -> i64 {
    (1_i64 << attempts.clamp(1, 6)).min(60)
}

/// Bulk-cancel a workflow's not-yet-claimed items. Items already
/// `processing` finish their current attempt; `claim_batch` keeps them from
/// being picked up again via the workflow join.
pub async fn cancel_pending(pool: &PgPool, workflow_id: Uuid) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE application_queue
         SET status = 'cancelled', updated_at = now()
         WHERE workflow_id = $1 AND status IN ('pending', 'rate_limited')",
    )
    .bind(workflow_id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

/// Delete a not-yet-claimed row outright. Returns false once the item has
/// been claimed or reached a terminal state.
pub async fn remove(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "DELETE FROM application_queue
         WHERE id = $1 AND status IN ('pending', 'rate_limited')",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() > 0)
}

/// Return items stuck in `processing` to the claimable pool. Covers worker
/// crashes mid-attempt; the staleness bound must exceed the longest
/// legitimate attempt.
pub async fn requeue_stale(pool: &PgPool, stale_after_minutes: i64) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE application_queue
         SET status = 'pending', updated_at = now()
         WHERE status = 'processing'
           AND updated_at < now() - make_interval(mins => $1::int)",
    )
    .bind(stale_after_minutes as i32)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

pub async fn workflow_status_counts(
    pool: &PgPool,
    workflow_id: Uuid,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM application_queue
         WHERE workflow_id = $1 GROUP BY status",
    )
    .bind(workflow_id)
    .fetch_all(pool)
    .await
}

pub async fn global_status_counts(pool: &PgPool) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM application_queue GROUP BY status",
    )
    .fetch_all(pool)
    .await
}
