use sqlx::PgPool;
use uuid::Uuid;

use crate::db;

/// Per-user submission caps mirroring the job board's limits. These are
/// configuration, not business rules; see `Config::from_env`.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub hourly_limit: i64,
    pub daily_limit: i64,
    pub cooldown_minutes: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            hourly_limit: 8,
            daily_limit: 200,
            cooldown_minutes: 60,
        }
    }
}

/// Whether the user may submit right now. Application rows are the ground
/// truth for both windows.
pub async fn can_submit(
    pool: &PgPool,
    user_id: Uuid,
    limits: &RateLimitConfig,
) -> Result<bool, sqlx::Error> {
    let hourly = db::applications::count_in_window(pool, user_id, 60).await?;
    if hourly >= limits.hourly_limit {
        return Ok(false);
    }
    let daily = db::applications::count_in_window(pool, user_id, 24 * 60).await?;
    Ok(daily < limits.daily_limit)
}
