/// Wishlists
///
/// Every user has at most one wishlist, created lazily the first time it is
/// needed.

use crate::models::product::Product;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Wishlist {
    pub id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Wishlist {
    /// Returns the user's wishlist, creating it if needed
    pub async fn find_or_create_for_user(pool: &PgPool, user_id: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Wishlist>(
            r#"
            INSERT INTO wishlists (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, created_at
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Adds a product; adding it twice is a no-op
    pub async fn add_product(&self, pool: &PgPool, product_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO wishlist_products (wishlist_id, product_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(self.id)
        .bind(product_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Removes a product, returning true if it was on the list
    pub async fn remove_product(&self, pool: &PgPool, product_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM wishlist_products WHERE wishlist_id = $1 AND product_id = $2")
            .bind(self.id)
            .bind(product_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Products on the list, most recently added first
    pub async fn products(&self, pool: &PgPool) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT p.id, p.brand_id, p.name, p.description, p.created_at, p.updated_at
            FROM products p
            JOIN wishlist_products wp ON wp.product_id = p.id
            WHERE wp.wishlist_id = $1
            ORDER BY wp.added_at DESC
            "#,
        )
        .bind(self.id)
        .fetch_all(pool)
        .await
    }
}
