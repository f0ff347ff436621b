/// Product and tag models
///
/// Products belong to a brand and carry any number of free-form tags. Tags
/// are shared across products and created on first use by name.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE products (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     brand_id UUID NOT NULL REFERENCES brands (id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE tags (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL UNIQUE
/// );
///
/// CREATE TABLE product_tags (
///     product_id UUID NOT NULL REFERENCES products (id) ON DELETE CASCADE,
///     tag_id UUID NOT NULL REFERENCES tags (id) ON DELETE CASCADE,
///     PRIMARY KEY (product_id, tag_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use shelfie_shared::models::brand::Brand;
/// use shelfie_shared::models::product::{CreateProduct, Product};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let brand = Brand::find_or_create(&pool, "Test Brand").await?;
/// let product = Product::create(&pool, CreateProduct {
///     brand_id: brand.id,
///     name: "Test Product".to_string(),
///     description: Some("This is a test product.".to_string()),
///     tags: vec!["Hydrating".to_string(), "Vegan".to_string()],
/// }).await?;
///
/// let tags = Product::tags_for(&pool, product.id).await?;
/// assert_eq!(tags.len(), 2);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const PRODUCT_COLUMNS: &str = "id, brand_id, name, description, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

/// Input for creating a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProduct {
    pub brand_id: Uuid,
    pub name: String,
    pub description: Option<String>,

    /// Tag names; unknown tags are created
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Product {
    /// Inserts a product and links its tags in one transaction
    pub async fn create(pool: &PgPool, data: CreateProduct) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO products (brand_id, name, description) VALUES ($1, $2, $3) RETURNING {}",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(data.brand_id)
            .bind(&data.name)
            .bind(&data.description)
            .fetch_one(&mut *tx)
            .await?;

        for name in data.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            let (tag_id,): (Uuid,) = sqlx::query_as(
                r#"
                INSERT INTO tags (name) VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                "#,
            )
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO product_tags (product_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(product.id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(product)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);

        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists products, newest first, optionally for one brand
    pub async fn list(
        pool: &PgPool,
        brand_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM products
             WHERE ($1::UUID IS NULL OR brand_id = $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
            PRODUCT_COLUMNS
        );

        sqlx::query_as::<_, Product>(&query)
            .bind(brand_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Tags attached to a product, by name
    pub async fn tags_for(pool: &PgPool, product_id: Uuid) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name
            FROM tags t
            JOIN product_tags pt ON pt.tag_id = t.id
            WHERE pt.product_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(product_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
