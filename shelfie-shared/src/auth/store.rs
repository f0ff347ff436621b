/// Local user store
///
/// Provisioning only needs a few things from the local database: insert a
/// user row and look one up by email or id. [`UserStore`] is that seam, with a Postgres
/// implementation for the running service and an in-memory one for tests.
///
/// # Example
///
/// ```
/// use shelfie_shared::auth::store::{MemoryUserStore, UserStore};
/// use shelfie_shared::models::user::CreateUser;
///
/// # async fn example() {
/// let store = MemoryUserStore::new();
/// store.create_user(CreateUser {
///     id: "u1".to_string(),
///     email: "a@x.com".to_string(),
///     username: String::new(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await.unwrap();
///
/// assert!(store.find_by_email("A@x.com").await.unwrap().is_some());
/// # }
/// ```

use crate::models::user::{CreateUser, User};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Local store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User already exists: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("User store unavailable: {0}")]
    Unavailable(String),
}

/// Operations provisioning needs from the local user table
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user row
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError>;

    /// Looks up a user by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Looks up a user by identity account id
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;
}

/// Postgres-backed user store
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        let email = data.email.clone();

        User::create(&self.pool, data).await.map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Duplicate(email)
            }
            other => StoreError::Database(other),
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }
}

/// In-memory user store with failure injection
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
    fail_create: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `create_user` fail as if the database were unreachable
    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all stored users
    pub async fn users(&self) -> Vec<User> {
        self.users.lock().await.clone()
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.lock().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }

        let mut users = self.users.lock().await;
        let taken = users
            .iter()
            .any(|u| u.id == data.id || u.email.eq_ignore_ascii_case(&data.email));
        if taken {
            return Err(StoreError::Duplicate(data.email));
        }

        let now = Utc::now();
        let user = User {
            id: data.id,
            email: data.email.to_lowercase(),
            username: data.username,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().await.iter().find(|u| u.id == id).cloned())
    }
}
