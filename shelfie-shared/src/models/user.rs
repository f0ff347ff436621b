/// User model and database operations
///
/// A `User` row is the local half of an account. Its `id` is the identity
/// provider's account id, which makes it the join key between the two stores:
/// a row must never exist without a provider account of the same id.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id TEXT PRIMARY KEY,
///     email CITEXT NOT NULL UNIQUE,
///     username VARCHAR(255) NOT NULL DEFAULT '',
///     password_hash VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use shelfie_shared::models::user::{User, CreateUser};
/// use shelfie_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     id: "8d0fd2b3-9ca7-4e6d-a8a5-6a1b3c2f0e11".to_string(),
///     email: "user@example.com".to_string(),
///     username: String::new(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "USER@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

const USER_COLUMNS: &str = "id, email::TEXT AS email, username, password_hash, created_at, updated_at";

/// User model representing a local account row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Identity provider account id
    pub id: String,

    /// Email address (case-insensitive via CITEXT)
    pub email: String,

    /// Display handle, empty until the user picks one
    pub username: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// When the row was created
    pub created_at: DateTime<Utc>,

    /// When the row was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Identity provider account id
    pub id: String,

    /// Email address
    pub email: String,

    /// Display handle
    pub username: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,
}

impl User {
    /// Inserts a new user row
    ///
    /// # Errors
    ///
    /// Returns an error if the id or email already exists, or the database
    /// connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (id, email, username, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.id)
            .bind(data.email)
            .bind(data.username)
            .bind(data.password_hash)
            .fetch_one(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by email address
    ///
    /// The input is lower-cased before lookup; the column is CITEXT, so
    /// matching is case-insensitive either way.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(email.to_lowercase())
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Deletes a user by ID
    ///
    /// Cascades to the user's profile, reviews, likes, comments and wishlist.
    /// Returns true if a row was deleted.
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user by email
    pub async fn delete_by_email(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE email = $1")
            .bind(email.to_lowercase())
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
