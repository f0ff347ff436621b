/// Review model
///
/// A user's 1–5 star rating of a product with an optional comment. The range
/// is checked here before the insert and again by the table's CHECK
/// constraint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

const REVIEW_COLUMNS: &str = "id, user_id, product_id, rating, comment, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub user_id: String,
    pub product_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReview {
    pub user_id: String,
    pub product_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
}

/// Review with its like count, as shown on a product page
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewWithLikes {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub review: Review,
    pub likes: i64,
}

/// Returns true if `rating` is a valid star count
pub fn is_valid_rating(rating: i16) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}

impl Review {
    /// Inserts a review
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error::Protocol` for an out-of-range rating without
    /// touching the database
    pub async fn create(pool: &PgPool, data: CreateReview) -> Result<Self, sqlx::Error> {
        if !is_valid_rating(data.rating) {
            return Err(sqlx::Error::Protocol(format!(
                "rating must be between {} and {}, got {}",
                MIN_RATING, MAX_RATING, data.rating
            )));
        }

        let query = format!(
            "INSERT INTO reviews (user_id, product_id, rating, comment)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            REVIEW_COLUMNS
        );

        sqlx::query_as::<_, Review>(&query)
            .bind(data.user_id)
            .bind(data.product_id)
            .bind(data.rating)
            .bind(data.comment)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM reviews WHERE id = $1", REVIEW_COLUMNS);

        sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Reviews of a product with like counts, newest first
    pub async fn list_by_product(pool: &PgPool, product_id: Uuid) -> Result<Vec<ReviewWithLikes>, sqlx::Error> {
        sqlx::query_as::<_, ReviewWithLikes>(
            r#"
            SELECT r.id, r.user_id, r.product_id, r.rating, r.comment, r.created_at,
                   COUNT(l.user_id) AS likes
            FROM reviews r
            LEFT JOIN likes l ON l.review_id = r.id
            WHERE r.product_id = $1
            GROUP BY r.id
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(pool)
        .await
    }

    /// Deletes a review if it belongs to `user_id`
    pub async fn delete(pool: &PgPool, id: Uuid, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
