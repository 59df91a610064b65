use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Cv;

/// Look up a CV scoped to its owner.
pub async fn find_for_user(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Cv>, sqlx::Error> {
    sqlx::query_as::<_, Cv>("SELECT * FROM cvs WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}
