/// Error handling for the API server
///
/// All handlers return `ApiResult<T>`. Errors render as a JSON body:
///
/// ```json
/// { "error": "create-user-error", "message": "We could not finish setting up your account" }
/// ```
///
/// Internal details (database errors, identity provider messages) are logged
/// and never sent to the client.
///
/// # Example
///
/// ```
/// use shelfie_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(id: Option<String>) -> ApiResult<Json<Value>> {
///     let id = id.ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
///     Ok(Json(json!({ "id": id })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use shelfie_shared::auth::password::PasswordError;
use shelfie_shared::auth::session::SessionError;
use shelfie_shared::auth::store::StoreError;
use shelfie_shared::identity::IdentityError;
use shelfie_shared::provisioning::ProvisioningError;
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401) with a stable error code
    Unauthorized { code: &'static str, message: String },

    /// Not found (404)
    NotFound(String),

    /// Conflict (409)
    Conflict(String),

    /// Unprocessable entity (422)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Account provisioning failed (500). Logged with its cause; the client
    /// sees only the code and a generic message.
    Provisioning(ProvisioningError),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

impl ApiError {
    /// 401 with the generic `unauthorized` code
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            code: "unauthorized",
            message: message.into(),
        }
    }
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "create-user-error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized { message, .. } => write!(f, "Unauthorized: {}", message),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Provisioning(err) => write!(f, "Provisioning failed: {}", err),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized { code, message } => (StatusCode::UNAUTHORIZED, code, message, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::Provisioning(err) => {
                tracing::error!(code = err.code(), error = %err, "Account provisioning failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    err.code(),
                    err.public_message().to_string(),
                    None,
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg, None)
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    return constraint_violation(constraint);
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            sqlx::Error::PoolTimedOut => {
                ApiError::ServiceUnavailable("Database is unavailable".to_string())
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Maps a violated constraint to a client error without naming it
fn constraint_violation(constraint: &str) -> ApiError {
    tracing::warn!(constraint = %constraint, "Database constraint violated");

    if constraint.ends_with("_fkey") {
        ApiError::NotFound("Referenced resource not found".to_string())
    } else {
        ApiError::Conflict("Resource already exists".to_string())
    }
}

impl From<ProvisioningError> for ApiError {
    fn from(err: ProvisioningError) -> Self {
        ApiError::Provisioning(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => e.into(),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

/// Identity errors outside provisioning (sign-in, refresh)
impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected { .. } | IdentityError::NotFound => {
                ApiError::unauthorized("Invalid credentials")
            }
            IdentityError::Transport(msg) => {
                tracing::error!(error = %msg, "Identity provider unreachable");
                ApiError::ServiceUnavailable("Authentication service unavailable".to_string())
            }
            IdentityError::InvalidResponse(msg) => {
                ApiError::InternalError(format!("Identity provider response: {}", msg))
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::CreateError(msg) => ApiError::InternalError(msg),
            SessionError::Expired => ApiError::unauthorized("Session expired"),
            SessionError::ValidationError(_) => ApiError::unauthorized("Invalid session"),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationError(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Product not found".to_string());
        assert_eq!(err.to_string(), "Not found: Product not found");
    }

    #[tokio::test]
    async fn test_provisioning_error_hides_details() {
        let err: ApiError = ProvisioningError::SessionIssuanceFailed("connection reset by peer".to_string()).into();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "create-session-error");
        assert!(!body["message"].as_str().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_unauthorized_code() {
        let response = ApiError::Unauthorized {
            code: "invalid-refresh-token",
            message: "Sign in again".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "invalid-refresh-token");
    }

    #[tokio::test]
    async fn test_constraint_violation_hides_constraint_name() {
        let response = constraint_violation("users_email_key").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert!(!body["message"].as_str().unwrap().contains("users_email_key"));

        let err = constraint_violation("reviews_product_id_fkey");
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(!err.to_string().contains("reviews_product_id_fkey"));
    }

    #[test]
    fn test_identity_transport_is_unavailable() {
        let err: ApiError = IdentityError::Transport("timeout".to_string()).into();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));

        let err: ApiError = IdentityError::Rejected {
            status: 400,
            message: "Invalid login credentials".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::Unauthorized { .. }));
    }
}
