/// Profile endpoints (session required)
///
/// # Endpoints
///
/// - `GET /v1/profile` - the caller's profile
/// - `PUT /v1/profile` - create or update the caller's profile
/// - `DELETE /v1/profile` - delete the caller's profile
/// - `GET /v1/profiles?limit=&offset=` - newest users' profiles

use super::Pagination;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::session::CurrentUser,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use shelfie_shared::models::user_profile::{ProfileFields, UserProfile, UserProfileWithUser};
use validator::Validate;

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 2000, message = "Bio is too long"))]
    pub bio: Option<String>,

    #[validate(url(message = "Avatar must be a URL"), length(max = 512))]
    pub avatar_url: Option<String>,
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<UserProfileWithUser>> {
    UserProfile::find_by_user_id(&state.db, &user.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))
}

/// Upserts the caller's profile, returning the stored row joined with the user
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfileWithUser>> {
    req.validate()?;

    let fields = ProfileFields {
        bio: req.bio,
        avatar_url: req.avatar_url,
    };
    UserProfile::upsert(&state.db, &user.user_id, fields).await?;

    tracing::debug!(user_id = %user.user_id, "Profile updated");

    UserProfile::find_by_user_id(&state.db, &user.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::InternalError("Profile vanished after update".to_string()))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    if UserProfile::delete(&state.db, &user.user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Profile not found".to_string()))
    }
}

pub async fn list_profiles(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<UserProfileWithUser>>> {
    let (limit, offset) = page.resolve();
    Ok(Json(UserProfile::list(&state.db, limit, offset).await?))
}
