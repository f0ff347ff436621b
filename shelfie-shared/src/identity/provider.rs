/// Identity provider contract
///
/// The identity provider is the system of record for credentials and the
/// issuer of sessions. Shelfie talks to it through the [`IdentityProvider`]
/// trait so the provisioning saga can be exercised against an in-memory
/// provider in tests and against GoTrue in production.
///
/// Every operation returns a `Result`. Callers that only care whether the
/// operation happened (the provisioning saga) treat any `Err`, including a
/// transport fault, as "not done".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity provider error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The provider refused the request (duplicate email, bad credentials,
    /// password policy, invalid refresh token, ...)
    #[error("Identity provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The account does not exist
    #[error("Identity account not found")]
    NotFound,

    /// Network or timeout failure talking to the provider
    #[error("Identity provider transport error: {0}")]
    Transport(String),

    /// The provider answered with something we could not understand
    #[error("Invalid identity provider response: {0}")]
    InvalidResponse(String),
}

/// Identity result type alias
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Account record held by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAccount {
    /// Provider-assigned opaque account id
    pub id: String,

    /// Account email
    pub email: String,
}

/// Session issued by the identity provider
///
/// Sessions are stateless bearer tokens; nothing server-side needs to be
/// cleaned up when one is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Account id the session is bound to
    pub user_id: String,

    /// Account email
    pub email: String,

    /// Provider access token
    pub access_token: String,

    /// Provider refresh token
    pub refresh_token: String,

    /// Access token lifetime in seconds, as reported by the provider
    pub expires_in: i64,

    /// Absolute access token expiry
    pub expires_at: DateTime<Utc>,
}

/// Core identity provider trait
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name, used in logs
    fn name(&self) -> &str;

    /// Creates a confirmed email/password account
    async fn create_account(&self, email: &str, password: &str) -> IdentityResult<IdentityAccount>;

    /// Signs in with email and password, issuing a new session
    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<AuthSession>;

    /// Exchanges a refresh token for a fresh session
    async fn refresh_session(&self, refresh_token: &str) -> IdentityResult<AuthSession>;

    /// Deletes an account
    async fn delete_account(&self, account_id: &str) -> IdentityResult<()>;

    /// Looks an account up by email
    async fn find_account_by_email(&self, email: &str) -> IdentityResult<Option<IdentityAccount>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_error_display() {
        let err = IdentityError::Rejected {
            status: 422,
            message: "User already registered".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Identity provider rejected the request (422): User already registered"
        );

        assert_eq!(IdentityError::NotFound.to_string(), "Identity account not found");
    }

    #[test]
    fn test_auth_session_serialization() {
        let session = AuthSession {
            user_id: "u1".to_string(),
            email: "a@x.com".to_string(),
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: 3600,
            expires_at: Utc::now(),
        };

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["user_id"], "u1");
        assert_eq!(json["expires_in"], 3600);
    }
}
