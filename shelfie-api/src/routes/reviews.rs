/// Review, like and comment endpoints
///
/// # Endpoints
///
/// - `POST /v1/products/:id/reviews` - review a product (session)
/// - `GET /v1/reviews/:id/comments` - comments, oldest first
/// - `POST /v1/reviews/:id/comments` - comment on a review (session)
/// - `POST /v1/reviews/:id/like` - like a review; repeat likes are no-ops (session)
/// - `DELETE /v1/reviews/:id/like` - remove the caller's like (session)
///
/// Unknown product or review ids surface as `404` through the foreign key
/// violation mapping in [`crate::error`].

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::session::CurrentUser,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use shelfie_shared::models::{
    comment::{Comment, CreateComment},
    like::Like,
    review::{CreateReview, Review},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,

    #[validate(length(max = 5000, message = "Review is too long"))]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 2000, message = "Comment must be 1 to 2000 characters"))]
    pub content: String,
}

/// Like state of a review after a like or unlike
#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub review_id: Uuid,
    pub liked: bool,
    pub likes: i64,
}

pub async fn create_review(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(product_id): Path<Uuid>,
    Json(req): Json<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    req.validate()?;

    let review = Review::create(
        &state.db,
        CreateReview {
            user_id: user.user_id,
            product_id,
            rating: req.rating,
            comment: req.comment,
        },
    )
    .await?;

    tracing::info!(review_id = %review.id, product_id = %product_id, "Review created");
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Comment>>> {
    if Review::find_by_id(&state.db, review_id).await?.is_none() {
        return Err(ApiError::NotFound("Review not found".to_string()));
    }

    Ok(Json(Comment::list_by_review(&state.db, review_id).await?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(review_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    req.validate()?;

    let comment = Comment::create(
        &state.db,
        CreateComment {
            user_id: user.user_id,
            review_id,
            content: req.content,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn like_review(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(review_id): Path<Uuid>,
) -> ApiResult<Json<LikeResponse>> {
    Like::create(&state.db, &user.user_id, review_id).await?;
    let likes = Like::count_for_review(&state.db, review_id).await?;

    Ok(Json(LikeResponse {
        review_id,
        liked: true,
        likes,
    }))
}

pub async fn unlike_review(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(review_id): Path<Uuid>,
) -> ApiResult<Json<LikeResponse>> {
    Like::delete(&state.db, &user.user_id, review_id).await?;
    let likes = Like::count_for_review(&state.db, review_id).await?;

    Ok(Json(LikeResponse {
        review_id,
        liked: false,
        likes,
    }))
}
