/// Review likes
///
/// One row per (user, review). Liking twice is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Like {
    pub user_id: String,
    pub review_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Like {
    /// Likes a review, returning the existing like if there is one
    pub async fn create(pool: &PgPool, user_id: &str, review_id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO likes (user_id, review_id) VALUES ($1, $2)
            ON CONFLICT (user_id, review_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING user_id, review_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(review_id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, user_id: &str, review_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND review_id = $2")
            .bind(user_id)
            .bind(review_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_for_review(pool: &PgPool, review_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM likes WHERE review_id = $1")
            .bind(review_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
