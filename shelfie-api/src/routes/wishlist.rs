/// Wishlist endpoints (session required)
///
/// Every user has at most one wishlist; it is created on first use.
///
/// - `GET /v1/wishlist`
/// - `PUT /v1/wishlist/products/:id`
/// - `DELETE /v1/wishlist/products/:id`

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
use serde::Serialize;
use shelfie_shared::models::{product::Product, wishlist::Wishlist};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    #[serde(flatten)]
    pub wishlist: Wishlist,
    pub products: Vec<Product>,
}

pub async fn get_wishlist(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<WishlistResponse>> {
    let wishlist = Wishlist::find_or_create_for_user(&state.db, &user.user_id).await?;
    let products = wishlist.products(&state.db).await?;

    Ok(Json(WishlistResponse { wishlist, products }))
}

/// Adds a product; adding it twice is a no-op
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let wishlist = Wishlist::find_or_create_for_user(&state.db, &user.user_id).await?;
    wishlist.add_product(&state.db, product_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let wishlist = Wishlist::find_or_create_for_user(&state.db, &user.user_id).await?;

    if wishlist.remove_product(&state.db, product_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Product is not on the wishlist".to_string()))
    }
}
