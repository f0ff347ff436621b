/// User profile model and database operations
///
/// Each user owns at most one profile, keyed by `user_id`. Reads return the
/// profile together with a short summary of its user.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_profiles (
///     user_id TEXT PRIMARY KEY REFERENCES users (id) ON DELETE CASCADE,
///     bio TEXT,
///     avatar_url VARCHAR(512),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Profile row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub user_id: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of `User` shown alongside a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// Profile joined with its user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileWithUser {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub user: UserSummary,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    bio: Option<String>,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    username: String,
    email: String,
}

impl From<ProfileRow> for UserProfileWithUser {
    fn from(row: ProfileRow) -> Self {
        Self {
            user: UserSummary {
                id: row.user_id.clone(),
                username: row.username,
                email: row.email,
            },
            profile: UserProfile {
                user_id: row.user_id,
                bio: row.bio,
                avatar_url: row.avatar_url,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

/// Profile fields a user can set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileFields {
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

const JOINED_SELECT: &str = r#"
    SELECT p.user_id, p.bio, p.avatar_url, p.created_at, p.updated_at,
           u.username, u.email::TEXT AS email
    FROM user_profiles p
    JOIN users u ON u.id = p.user_id
"#;

impl UserProfile {
    /// Creates a profile for a user that has none
    ///
    /// # Errors
    ///
    /// Fails if the user already has a profile or doesn't exist
    pub async fn create(pool: &PgPool, user_id: &str, fields: ProfileFields) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id, bio, avatar_url)
            VALUES ($1, $2, $3)
            RETURNING user_id, bio, avatar_url, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(fields.bio)
        .bind(fields.avatar_url)
        .fetch_one(pool)
        .await
    }

    /// Finds a user's profile with its user summary
    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Option<UserProfileWithUser>, sqlx::Error> {
        let query = format!("{} WHERE p.user_id = $1", JOINED_SELECT);

        let row = sqlx::query_as::<_, ProfileRow>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Creates the profile or replaces its fields
    pub async fn upsert(pool: &PgPool, user_id: &str, fields: ProfileFields) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id, bio, avatar_url)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET bio = EXCLUDED.bio,
                avatar_url = EXCLUDED.avatar_url,
                updated_at = NOW()
            RETURNING user_id, bio, avatar_url, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(fields.bio)
        .bind(fields.avatar_url)
        .fetch_one(pool)
        .await
    }

    /// Deletes a user's profile, returning true if one existed
    pub async fn delete(pool: &PgPool, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists profiles, newest users first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<UserProfileWithUser>, sqlx::Error> {
        let query = format!(
            "{} ORDER BY u.created_at DESC LIMIT $1 OFFSET $2",
            JOINED_SELECT
        );

        let rows = sqlx::query_as::<_, ProfileRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_with_user_serializes_flat() {
        let now = Utc::now();
        let row = ProfileRow {
            user_id: "u1".to_string(),
            bio: Some("hi".to_string()),
            avatar_url: None,
            created_at: now,
            updated_at: now,
            username: "sam".to_string(),
            email: "a@x.com".to_string(),
        };

        let json = serde_json::to_value(UserProfileWithUser::from(row)).unwrap();
        assert_eq!(json["user_id"], "u1");
        assert_eq!(json["bio"], "hi");
        assert_eq!(json["user"]["id"], "u1");
        assert_eq!(json["user"]["email"], "a@x.com");
    }
}
