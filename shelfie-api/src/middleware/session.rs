/// Session cookie authentication
///
/// Reads the signed session cookie, validates it and inserts a
/// [`CurrentUser`] into the request extensions. When the provider access
/// token carried by the cookie has expired, the session is refreshed with
/// the identity provider and a new cookie is set on the response.
///
/// Requests without a valid session get `401` and the cookie is cleared.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use shelfie_shared::auth::session::{
    clear_session_cookie, create_session_token, read_cookie, session_cookie, validate_session_token,
    SessionClaims,
};

/// The authenticated user, available to handlers via `Extension<CurrentUser>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// Identity account id, equal to the local user id
    pub user_id: String,
    pub email: String,
}

impl From<&SessionClaims> for CurrentUser {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            email: claims.email.clone(),
        }
    }
}

/// Returns the session token from the request's `Cookie` header(s)
pub fn session_token<'a>(req: &'a Request, cookie_name: &str) -> Option<&'a str> {
    req.headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| read_cookie(value, cookie_name))
}

fn reject(state: &AppState, err: ApiError) -> Response {
    let mut response = err.into_response();
    let cookie = clear_session_cookie(&state.config.session.cookie_name, state.config.api.production);
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

/// Cookie authentication middleware
pub async fn session_auth_layer(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let secret = state.session_secret();

    let claims = match session_token(&req, &state.config.session.cookie_name) {
        Some(token) => match validate_session_token(token, secret) {
            Ok(claims) => claims,
            Err(e) => return reject(&state, e.into()),
        },
        None => return ApiError::unauthorized("Missing session").into_response(),
    };

    let mut refreshed_cookie = None;
    let claims = if claims.provider_token_expired(Utc::now()) {
        tracing::debug!(user_id = %claims.sub, "Provider token expired, refreshing session");

        let session = match state.identity().refresh_session(&claims.refresh_token).await {
            Ok(session) if session.user_id == claims.sub => session,
            Ok(session) => {
                tracing::warn!(
                    expected = %claims.sub,
                    actual = %session.user_id,
                    "Refreshed session belongs to another account"
                );
                return reject(&state, ApiError::unauthorized("Invalid session"));
            }
            Err(e) => {
                tracing::info!(user_id = %claims.sub, error = %e, "Session refresh failed");
                return reject(&state, ApiError::unauthorized("Session expired"));
            }
        };

        let fresh = SessionClaims::from_auth_session(&session, state.config.session.max_age());
        match create_session_token(&fresh, secret) {
            Ok(token) => {
                refreshed_cookie = Some(session_cookie(
                    &state.config.session.cookie_name,
                    &token,
                    state.config.session.max_age(),
                    state.config.api.production,
                ));
            }
            Err(e) => return ApiError::from(e).into_response(),
        }
        fresh
    } else {
        claims
    };

    req.extensions_mut().insert(CurrentUser::from(&claims));

    let mut response = next.run(req).await;
    if let Some(cookie) = refreshed_cookie {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}
