/// GoTrue (Supabase Auth) identity provider client
///
/// Talks to the GoTrue REST API with `reqwest`:
///
/// | Operation | Request | Key |
/// |-----------|---------|-----|
/// | create account | `POST /auth/v1/admin/users` | service role |
/// | sign in | `POST /auth/v1/token?grant_type=password` | anon |
/// | refresh | `POST /auth/v1/token?grant_type=refresh_token` | anon |
/// | delete account | `DELETE /auth/v1/admin/users/{id}` | service role |
/// | find by email | `GET /auth/v1/admin/users?page=&per_page=` | service role |
///
/// Accounts are created with `email_confirm: true` so the follow-up sign-in
/// succeeds without a confirmation round-trip.
///
/// # Example
///
/// ```no_run
/// use shelfie_shared::identity::{GoTrueClient, GoTrueConfig, IdentityProvider};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GoTrueClient::new(GoTrueConfig {
///     url: "https://project.supabase.co".to_string(),
///     anon_key: "anon".to_string(),
///     service_role_key: "service-role".to_string(),
///     timeout_secs: 10,
/// })?;
///
/// let session = client.sign_in("a@x.com", "longenough1").await?;
/// println!("Signed in as {}", session.user_id);
/// # Ok(())
/// # }
/// ```

use crate::identity::{AuthSession, IdentityAccount, IdentityError, IdentityProvider, IdentityResult};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

/// Page size used when scanning the admin user list
const USER_PAGE_SIZE: usize = 100;

/// Connection settings for a GoTrue server
#[derive(Debug, Clone)]
pub struct GoTrueConfig {
    /// Base URL of the project (without `/auth/v1`)
    pub url: String,

    /// Public anon key, used for password and refresh grants
    pub anon_key: String,

    /// Service role key, used for the admin API
    pub service_role_key: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// GoTrue identity provider
#[derive(Debug, Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    config: GoTrueConfig,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl UserResponse {
    fn into_account(self) -> IdentityResult<IdentityAccount> {
        let email = required_email(self.email, &self.id)?;
        Ok(IdentityAccount { id: self.id, email })
    }
}

/// Callers match local rows by email, so an account without one is unusable
fn required_email(email: Option<String>, id: &str) -> IdentityResult<String> {
    match email {
        Some(email) if !email.trim().is_empty() => Ok(email),
        _ => Err(IdentityError::InvalidResponse(format!("user {} has no email", id))),
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserResponse,
}

impl TokenResponse {
    fn into_session(self) -> IdentityResult<AuthSession> {
        let expires_at = match self.expires_at.and_then(|ts| Utc.timestamp_opt(ts, 0).single()) {
            Some(at) => at,
            None => Duration::try_seconds(self.expires_in)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                .ok_or_else(|| {
                    IdentityError::InvalidResponse(format!("expires_in out of range: {}", self.expires_in))
                })?,
        };
        let email = required_email(self.user.email, &self.user.id)?;

        Ok(AuthSession {
            user_id: self.user.id,
            email,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
            expires_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UserListResponse {
    #[serde(default)]
    users: Vec<UserResponse>,
}

/// GoTrue error bodies are not uniform across endpoints
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> String {
        self.msg
            .or(self.error_description)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| "no error message".to_string())
    }
}

impl GoTrueClient {
    /// Creates a new client
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Transport` if the HTTP client cannot be built
    pub fn new(config: GoTrueConfig) -> IdentityResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IdentityError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.url.trim_end_matches('/'), path)
    }

    fn with_anon_key(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
    }

    fn with_service_role(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
    }

    async fn send(request: RequestBuilder) -> IdentityResult<Response> {
        request
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> IdentityResult<T> {
        if response.status().is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| IdentityError::InvalidResponse(e.to_string()))
        } else {
            Err(Self::rejection(response).await)
        }
    }

    async fn rejection(response: Response) -> IdentityError {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return IdentityError::NotFound;
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        IdentityError::Rejected {
            status: status.as_u16(),
            message: body.into_message(),
        }
    }

    async fn token_grant(&self, grant_type: &str, body: serde_json::Value) -> IdentityResult<AuthSession> {
        let request = self
            .http
            .post(self.endpoint("token"))
            .query(&[("grant_type", grant_type)])
            .json(&body);

        let response = Self::send(self.with_anon_key(request)).await?;
        let token: TokenResponse = Self::read_json(response).await?;

        token.into_session()
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    fn name(&self) -> &str {
        "gotrue"
    }

    async fn create_account(&self, email: &str, password: &str) -> IdentityResult<IdentityAccount> {
        tracing::debug!(email = %email, "Creating identity account");

        let request = self.http.post(self.endpoint("admin/users")).json(&json!({
            "email": email,
            "password": password,
            "email_confirm": true,
        }));

        let response = Self::send(self.with_service_role(request)).await?;
        let user: UserResponse = Self::read_json(response).await?;

        user.into_account()
    }

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<AuthSession> {
        tracing::debug!(email = %email, "Signing in with password grant");

        self.token_grant(
            "password",
            json!({
                "email": email,
                "password": password,
            }),
        )
        .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> IdentityResult<AuthSession> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn delete_account(&self, account_id: &str) -> IdentityResult<()> {
        tracing::debug!(account_id = %account_id, "Deleting identity account");

        let request = self
            .http
            .delete(self.endpoint(&format!("admin/users/{}", account_id)));

        let response = Self::send(self.with_service_role(request)).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::rejection(response).await)
        }
    }

    async fn find_account_by_email(&self, email: &str) -> IdentityResult<Option<IdentityAccount>> {
        let mut page = 1usize;

        loop {
            let request = self.http.get(self.endpoint("admin/users")).query(&[
                ("page", page.to_string()),
                ("per_page", USER_PAGE_SIZE.to_string()),
            ]);

            let response = Self::send(self.with_service_role(request)).await?;
            let list: UserListResponse = Self::read_json(response).await?;
            let fetched = list.users.len();

            let found = list.users.into_iter().find(|user| {
                user.email
                    .as_deref()
                    .is_some_and(|candidate| candidate.eq_ignore_ascii_case(email))
            });

            if let Some(user) = found {
                return user.into_account().map(Some);
            }

            if fetched < USER_PAGE_SIZE {
                return Ok(None);
            }

            page += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> GoTrueClient {
        GoTrueClient::new(GoTrueConfig {
            url: url.to_string(),
            anon_key: "anon".to_string(),
            service_role_key: "service".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = client("http://localhost:9999/");
        assert_eq!(
            client.endpoint("admin/users"),
            "http://localhost:9999/auth/v1/admin/users"
        );
    }

    #[test]
    fn test_error_body_message_precedence() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .unwrap();
        assert_eq!(body.into_message(), "Invalid login credentials");

        let body: ErrorBody = serde_json::from_str(r#"{"code":422,"msg":"User already registered"}"#).unwrap();
        assert_eq!(body.into_message(), "User already registered");

        assert_eq!(ErrorBody::default().into_message(), "no error message");
    }

    #[test]
    fn test_token_response_without_expires_at() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"user":{"id":"u1","email":"a@x.com"}}"#,
        )
        .unwrap();

        let session = token.into_session().unwrap();
        assert_eq!(session.user_id, "u1");
        assert!(session.expires_at > Utc::now());
    }

    #[test]
    fn test_token_response_with_out_of_range_lifetime() {
        let token: TokenResponse = serde_json::from_str(&format!(
            r#"{{"access_token":"a","refresh_token":"r","expires_in":{},"user":{{"id":"u1","email":"a@x.com"}}}}"#,
            i64::MAX
        ))
        .unwrap();

        assert!(matches!(token.into_session(), Err(IdentityError::InvalidResponse(_))));
    }

    #[test]
    fn test_session_without_email_is_rejected() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"user":{"id":"u1"}}"#,
        )
        .unwrap();
        assert!(matches!(token.into_session(), Err(IdentityError::InvalidResponse(_))));

        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"user":{"id":"u1","email":""}}"#,
        )
        .unwrap();
        assert!(matches!(token.into_session(), Err(IdentityError::InvalidResponse(_))));
    }

    #[test]
    fn test_account_without_email_is_rejected() {
        let user: UserResponse = serde_json::from_str(r#"{"id":"u1"}"#).unwrap();
        assert!(matches!(user.into_account(), Err(IdentityError::InvalidResponse(_))));
    }
}
