/// Session cookie tokens
///
/// The identity provider's session (access + refresh token pair) is never
/// stored server-side. It travels back to the browser inside a signed HS256
/// JWT, which is the value of the session cookie.
///
/// # Claims
///
/// - `sub`: identity account id (== local user id)
/// - `iss`: always `"shelfie"`
/// - `iat` / `nbf` / `exp`: issue, not-before and cookie expiry
/// - `email`, `access_token`, `refresh_token`, `provider_expires_at`: the
///   provider session being carried
///
/// # Example
///
/// ```
/// use shelfie_shared::auth::session::{create_session_token, validate_session_token, SessionClaims};
/// use shelfie_shared::identity::AuthSession;
/// use chrono::{Duration, Utc};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let session = AuthSession {
///     user_id: "u1".to_string(),
///     email: "a@x.com".to_string(),
///     access_token: "access".to_string(),
///     refresh_token: "refresh".to_string(),
///     expires_in: 3600,
///     expires_at: Utc::now() + Duration::hours(1),
/// };
///
/// let claims = SessionClaims::from_auth_session(&session, Duration::days(7));
/// let token = create_session_token(&claims, "secret-key-at-least-32-bytes-long!")?;
/// let validated = validate_session_token(&token, "secret-key-at-least-32-bytes-long!")?;
/// assert_eq!(validated.sub, "u1");
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::identity::AuthSession;

/// Token issuer
pub const ISSUER: &str = "shelfie";

/// Default cookie name
pub const DEFAULT_COOKIE_NAME: &str = "__session";

/// Error type for session token operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Failed to create token
    #[error("Failed to create session token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate session token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Session has expired")]
    Expired,
}

/// Claims stored in the session cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - identity account id / local user id
    pub sub: String,

    /// Issuer - always "shelfie"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Email of the signed-in user
    pub email: String,

    /// Provider access token
    pub access_token: String,

    /// Provider refresh token
    pub refresh_token: String,

    /// When the provider access token expires (Unix timestamp)
    pub provider_expires_at: i64,
}

impl SessionClaims {
    /// Builds claims carrying `session`, valid for `max_age`
    pub fn from_auth_session(session: &AuthSession, max_age: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: session.user_id.clone(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + max_age).timestamp(),
            nbf: now.timestamp(),
            email: session.email.clone(),
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            provider_expires_at: session.expires_at.timestamp(),
        }
    }

    /// Reconstructs the provider session carried by these claims
    pub fn to_auth_session(&self) -> AuthSession {
        let expires_at = Utc
            .timestamp_opt(self.provider_expires_at, 0)
            .single()
            .unwrap_or_else(Utc::now);

        AuthSession {
            user_id: self.sub.clone(),
            email: self.email.clone(),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_in: (expires_at - Utc::now()).num_seconds().max(0),
            expires_at,
        }
    }

    /// Checks if the cookie itself has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Checks if the carried provider access token has expired
    pub fn provider_token_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.provider_expires_at
    }
}

/// Signs session claims with HS256
pub fn create_session_token(claims: &SessionClaims, secret: &str) -> Result<String, SessionError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| SessionError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a session token and extracts its claims
///
/// Verifies signature, expiry, not-before and issuer.
pub fn validate_session_token(token: &str, secret: &str) -> Result<SessionClaims, SessionError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::ValidationError(format!("Token validation failed: {}", e)),
        }
    })?;

    Ok(token_data.claims)
}

/// Builds a `Set-Cookie` value carrying `token`
pub fn session_cookie(name: &str, token: &str, max_age: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name,
        token,
        max_age.num_seconds()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Builds a `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(name: &str, secure: bool) -> String {
    let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Extracts the value of cookie `name` from a `Cookie` request header
pub fn read_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
