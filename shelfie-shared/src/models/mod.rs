/// Database models for Shelfie
///
/// Each model exposes its queries as associated async functions taking a
/// `&PgPool`.
///
/// # Models
///
/// - `user`: local accounts, keyed by identity provider id
/// - `user_profile`: bio and avatar, one per user
/// - `brand`, `product`: the catalogue, with free-form product tags
/// - `review`, `like`, `comment`: user reviews and reactions to them
/// - `wishlist`: one saved-products list per user
///
/// # Example
///
/// ```no_run
/// use shelfie_shared::models::user_profile::{ProfileFields, UserProfile};
/// use shelfie_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// UserProfile::upsert(&pool, "u1", ProfileFields {
///     bio: Some("Skincare nerd".to_string()),
///     avatar_url: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod brand;
pub mod comment;
pub mod like;
pub mod product;
pub mod review;
pub mod user;
pub mod user_profile;
pub mod wishlist;
