/// Authentication endpoints
///
/// All endpoints answer success with `303 See Other` to the (sanitized)
/// `redirect_to` target and set the session cookie.
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - create an account (or sign in if it exists)
/// - `POST /v1/auth/login` - sign in with email and password
/// - `POST /v1/auth/callback` - finish an OAuth sign-in from a refresh token
/// - `POST /v1/auth/logout` - clear the session cookie

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use shelfie_shared::auth::password::validate_password_strength;
use shelfie_shared::auth::session::{clear_session_cookie, create_session_token, session_cookie, SessionClaims};
use shelfie_shared::identity::AuthSession;
use validator::{Validate, ValidationError};

/// Where users land after signing in when no redirect is given
pub const DEFAULT_REDIRECT: &str = "/profile";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "password_strength"))]
    pub password: String,

    pub redirect_to: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    pub redirect_to: Option<String>,
}

/// OAuth callback request
#[derive(Debug, Deserialize, Validate)]
pub struct CallbackRequest {
    /// Refresh token handed to the browser by the provider
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,

    /// Password for the local account copy
    #[validate(custom(function = "password_strength"))]
    pub password: String,

    pub redirect_to: Option<String>,
}

fn password_strength(password: &str) -> Result<(), ValidationError> {
    validate_password_strength(password).map_err(|message| {
        let mut err = ValidationError::new("password_strength");
        err.message = Some(message.into());
        err
    })
}

/// Returns `to` if it is a same-site absolute path, else `default`
///
/// Rejects protocol-relative (`//evil.com`) and backslash (`/\evil.com`)
/// forms that browsers resolve to another host.
pub fn safe_redirect<'a>(to: Option<&'a str>, default: &'a str) -> &'a str {
    match to {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\") => path,
        _ => default,
    }
}

/// 303 to `location` with the session cookie for `session`
fn session_redirect(state: &AppState, session: &AuthSession, location: &str) -> ApiResult<Response> {
    let max_age = state.config.session.max_age();
    let claims = SessionClaims::from_auth_session(session, max_age);
    let token = create_session_token(&claims, state.session_secret())?;
    let cookie = session_cookie(
        &state.config.session.cookie_name,
        &token,
        max_age,
        state.config.api.production,
    );

    redirect_with_cookie(location, &cookie)
}

fn redirect_with_cookie(location: &str, cookie: &str) -> ApiResult<Response> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::LOCATION,
        HeaderValue::from_str(location).map_err(|_| ApiError::BadRequest("Invalid redirect".to_string()))?,
    );
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(cookie).map_err(|e| ApiError::InternalError(format!("Invalid cookie: {}", e)))?,
    );

    Ok((StatusCode::SEE_OTHER, headers).into_response())
}

/// Register a new account
///
/// ```text
/// POST /v1/auth/register
/// { "email": "a@x.com", "password": "longenough1", "redirect_to": "/profile" }
/// ```
///
/// If a local user with this email already exists, the request is treated as
/// a sign-in. Otherwise the provisioning saga runs.
///
/// # Errors
///
/// - `401`: existing user, wrong password
/// - `422`: validation failed
/// - `500`: `create-account-error`, `create-session-error` or
///   `create-user-error`
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();
    let redirect_to = safe_redirect(req.redirect_to.as_deref(), DEFAULT_REDIRECT);

    if state.users().find_by_email(&email).await?.is_some() {
        tracing::debug!(email = %email, "Email already registered, signing in instead");
        let session = state.identity().sign_in(&email, &req.password).await?;
        return session_redirect(&state, &session, redirect_to);
    }

    let session = state.provisioner.provision(&email, &req.password).await?;

    session_redirect(&state, &session, redirect_to)
}

/// Sign in with email and password
///
/// # Errors
///
/// - `401`: bad credentials
/// - `503`: identity provider unreachable
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();
    let session = state.identity().sign_in(&email, &req.password).await?;

    tracing::info!(user_id = %session.user_id, "User signed in");
    session_redirect(&state, &session, safe_redirect(req.redirect_to.as_deref(), DEFAULT_REDIRECT))
}

/// Finish an OAuth sign-in
///
/// The refresh token comes from the browser, so it is exchanged with the
/// provider rather than trusted. First-time users get a local row via
/// `try_create_user`, which deletes the identity account if that fails.
///
/// # Errors
///
/// - `401 invalid-refresh-token`: the provider refused the token
/// - `500 create-user-error`: the local row could not be created
pub async fn callback(
    State(state): State<AppState>,
    Json(req): Json<CallbackRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let redirect_to = safe_redirect(req.redirect_to.as_deref(), DEFAULT_REDIRECT);

    let session = state
        .identity()
        .refresh_session(&req.refresh_token)
        .await
        .map_err(|e| {
            tracing::info!(error = %e, "OAuth refresh token rejected");
            ApiError::Unauthorized {
                code: "invalid-refresh-token",
                message: "The sign-in link is no longer valid".to_string(),
            }
        })?;

    if state.users().find_by_email(&session.email).await?.is_some() {
        return session_redirect(&state, &session, redirect_to);
    }

    state
        .provisioner
        .try_create_user(&session.user_id, &session.email, &req.password)
        .await?;

    session_redirect(&state, &session, redirect_to)
}

/// Clear the session cookie and go home
pub async fn logout(State(state): State<AppState>) -> ApiResult<Response> {
    let cookie = clear_session_cookie(&state.config.session.cookie_name, state.config.api.production);
    redirect_with_cookie("/", &cookie)
}
