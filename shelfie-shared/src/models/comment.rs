/// Comments on reviews

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: String,
    pub review_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComment {
    pub user_id: String,
    pub review_id: Uuid,
    pub content: String,
}

impl Comment {
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (user_id, review_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, review_id, content, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.review_id)
        .bind(data.content)
        .fetch_one(pool)
        .await
    }

    /// Comments on a review, oldest first
    pub async fn list_by_review(pool: &PgPool, review_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, user_id, review_id, content, created_at
            FROM comments
            WHERE review_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(review_id)
        .fetch_all(pool)
        .await
    }

    /// Deletes a comment if it belongs to `user_id`
    pub async fn delete(pool: &PgPool, id: Uuid, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
