use tokio::sync::watch;

use crate::breaker::BreakerError;
use crate::clients::core::SubmitRequest;
use crate::db;
use crate::models::queue_item::{JobPayload, QueueItem};
use crate::rate_limit;
use crate::state::SharedState;

/// Start a worker pool on a dedicated Tokio runtime with its own thread pool.
/// This runs on a separate OS thread and blocks until shutdown is signaled.
pub fn run_pool(
    state: SharedState,
    shutdown: watch::Receiver<bool>,
    worker_count: usize,
) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("worker-pool".into())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(worker_count.max(1))
                .thread_name("queue-worker")
                .enable_all()
                .build()
                .expect("Failed to build worker runtime");

            runtime.block_on(async {
                let mut handles = Vec::with_capacity(worker_count);

                for id in 0..worker_count {
                    handles.push(tokio::spawn(run(id, state.clone(), shutdown.clone())));
                }

                tracing::info!("Queue worker pool started ({worker_count} workers)");

                for handle in handles {
                    let _ = handle.await;
                }

                tracing::info!("Queue worker pool stopped");
            });
        })
        .expect("Failed to spawn worker pool thread")
}

/// A single polling loop. Store-level errors double the delay before the
/// next poll instead of crashing; the delay resets on the next good cycle.
async fn run(id: usize, state: SharedState, mut shutdown: watch::Receiver<bool>) {
    tracing::debug!("Worker {id} started");

    let base = std::time::Duration::from_secs(state.config.worker.poll_interval_secs);
    let max_backoff = std::time::Duration::from_secs(300);
    let mut delay = base;

    loop {
        if *shutdown.borrow() {
            break;
        }

        match run_cycle(&state).await {
            Ok(claimed) => {
                delay = base;
                if claimed > 0 {
                    continue;
                }
            }
            Err(e) => {
                tracing::error!("Worker {id} cycle error: {e}");
                delay = (delay * 2).min(max_backoff);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::debug!("Worker {id} stopped");
}

/// One polling cycle: requeue stale work, claim a batch, process each item
/// in claimed order. Item failures are contained; only store errors during
/// claiming escape to the loop.
pub async fn run_cycle(state: &SharedState) -> Result<usize, sqlx::Error> {
    let stale =
        db::queue::requeue_stale(&state.pool, state.config.worker.stale_after_minutes).await?;
    if stale > 0 {
        tracing::warn!(stale, "requeued stale processing items");
    }

    let batch = db::queue::claim_batch(&state.pool, state.config.worker.batch_size).await?;
    let claimed = batch.len();

    for item in batch {
        if let Err(e) = process_item(state, &item).await {
            // Recording the outcome failed; the item stays `processing` and
            // the stale requeue returns it to the pool.
            tracing::error!(item_id = %item.id, "failed to record item outcome: {e}");
        }
    }

    Ok(claimed)
}

/// Process one claimed item: rate check, CV fetch, AI customization, Core
/// submission, outcome recording.
async fn process_item(state: &SharedState, item: &QueueItem) -> Result<(), sqlx::Error> {
    tracing::debug!(
        item_id = %item.id,
        workflow_id = %item.workflow_id,
        job = %item.job_external_id,
        attempt = item.attempts + 1,
        "processing queue item"
    );

    if !rate_limit::can_submit(&state.pool, item.user_id, &state.config.limits).await? {
        tracing::info!(
            item_id = %item.id,
            user_id = %item.user_id,
            cooldown_minutes = state.config.limits.cooldown_minutes,
            "user over submission limits, rescheduling"
        );
        return db::queue::reschedule_rate_limited(
            &state.pool,
            item.id,
            state.config.limits.cooldown_minutes,
        )
        .await;
    }

    let payload: JobPayload = match serde_json::from_value(item.payload.clone()) {
        Ok(p) => p,
        Err(e) => return fail_permanent(state, item, &format!("invalid payload: {e}")).await,
    };

    let cv = db::cvs::find_for_user(&state.pool, item.cv_id, item.user_id).await?;
    let parsed = match cv.and_then(|c| c.parsed_data) {
        Some(data) => data,
        None => return fail_permanent(state, item, "CV missing or not parsed").await,
    };

    let customized = match state.ai.customize_cv(&parsed, &payload.description).await {
        Ok(v) => v,
        Err(e) => {
            return fail_attempt(state, item, &format!("cv customization failed: {e}")).await;
        }
    };

    let cover_letter = match state
        .ai
        .generate_cover_letter(&parsed, &payload.description, &payload.company)
        .await
    {
        Ok(v) => v,
        Err(e) => {
            return fail_attempt(state, item, &format!("cover letter generation failed: {e}"))
                .await;
        }
    };

    let request = SubmitRequest {
        job_external_id: item.job_external_id.clone(),
        customized_cv: customized,
        cover_letter,
    };

    let retry = &state.config.retry;
    let outcome = state
        .breaker
        .call(|| retry.run(|| state.core.submit(&request)))
        .await;

    match outcome {
        Ok(resp) => {
            db::applications::insert_submitted(
                &state.pool,
                item.user_id,
                &item.job_external_id,
                &request.cover_letter,
                &resp.raw,
                resp.resume_id.as_deref(),
                resp.negotiation_id.as_deref(),
            )
            .await?;
            db::queue::mark_submitted(&state.pool, item.id).await?;
            tracing::info!(item_id = %item.id, job = %item.job_external_id, "application submitted");
            Ok(())
        }
        Err(BreakerError::Open) => {
            // Distinct from an item-specific failure: the downstream is
            // down, no network call was attempted.
            tracing::warn!(item_id = %item.id, "core circuit open, rescheduling without submitting");
            fail_attempt(state, item, "core circuit open").await
        }
        Err(BreakerError::Inner(err)) => {
            if retry.is_retryable(&err) {
                fail_attempt(state, item, &format!("core submission failed: {err}")).await
            } else {
                fail_permanent(state, item, &format!("core rejected submission: {err}")).await
            }
        }
    }
}

/// A transient attempt failure: consume one attempt, then back off or fail
/// terminally once the budget is exhausted.
async fn fail_attempt(
    state: &SharedState,
    item: &QueueItem,
    error: &str,
) -> Result<(), sqlx::Error> {
    let attempts = item.attempts + 1;

    if attempts >= state.config.worker.max_attempts {
        tracing::warn!(item_id = %item.id, attempts, "retry budget exhausted: {error}");
        db::applications::insert_failed(&state.pool, item.user_id, &item.job_external_id, error)
            .await?;
        db::queue::mark_failed(&state.pool, item.id, attempts, error).await
    } else {
        tracing::info!(item_id = %item.id, attempts, "attempt failed, rescheduling: {error}");
        db::queue::reschedule_retry(&state.pool, item.id, attempts, error).await
    }
}

/// A permanent item error (bad data, non-retryable rejection): terminal
/// immediately, no backoff.
async fn fail_permanent(
    state: &SharedState,
    item: &QueueItem,
    error: &str,
) -> Result<(), sqlx::Error> {
    tracing::warn!(item_id = %item.id, "permanent failure: {error}");
    db::applications::insert_failed(&state.pool, item.user_id, &item.job_external_id, error)
        .await?;
    db::queue::mark_failed(&state.pool, item.id, item.attempts + 1, error).await
}
