/// Public catalogue endpoints
///
/// # Endpoints
///
/// - `GET /v1/brands`
/// - `GET /v1/products?brand_id=&limit=&offset=`
/// - `GET /v1/products/:id` - product with brand, tags and reviews

use super::Pagination;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use shelfie_shared::models::{
    brand::Brand,
    product::{Product, Tag},
    review::{Review, ReviewWithLikes},
};
use uuid::Uuid;

/// Product list filters
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub brand_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ProductQuery {
    // Not flattened: serde_urlencoded can't parse numbers through `flatten`.
    fn page(&self) -> Pagination {
        Pagination {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Product page
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub brand: Option<Brand>,
    pub tags: Vec<Tag>,
    pub reviews: Vec<ReviewWithLikes>,
}

pub async fn list_brands(State(state): State<AppState>) -> ApiResult<Json<Vec<Brand>>> {
    Ok(Json(Brand::list(&state.db).await?))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    let (limit, offset) = query.page().resolve();
    let products = Product::list(&state.db, query.brand_id, limit, offset).await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProductDetail>> {
    let product = Product::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    let brand = Brand::find_by_id(&state.db, product.brand_id).await?;
    let tags = Product::tags_for(&state.db, id).await?;
    let reviews = Review::list_by_product(&state.db, id).await?;

    Ok(Json(ProductDetail {
        product,
        brand,
        tags,
        reviews,
    }))
}
