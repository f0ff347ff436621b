/// Demo data seeding
///
/// Re-runnable: the demo user's local rows are deleted and rebuilt on every
/// run (deleting the user cascades to its profile, reviews, likes, comments
/// and wishlist), while the identity account and the brand are reused.

use shelfie_shared::auth::password::{hash_password, PasswordError};
use shelfie_shared::identity::{IdentityError, IdentityProvider};
use shelfie_shared::models::{
    brand::Brand,
    comment::{Comment, CreateComment},
    like::Like,
    product::{CreateProduct, Product},
    review::{CreateReview, Review},
    user::{CreateUser, User},
    user_profile::{ProfileFields, UserProfile},
    wishlist::Wishlist,
};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEMO_USERNAME: &str = "supabase_user";
pub const DEMO_BRAND: &str = "Test Brand";
pub const DEMO_PRODUCT: &str = "Test Product";
pub const DEMO_TAGS: [&str; 2] = ["Hydrating", "Vegan"];

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing failed: {0}")]
    Password(#[from] PasswordError),
}

/// What a seed run created
#[derive(Debug, Clone)]
pub struct SeedReport {
    pub user_id: String,
    pub email: String,
    /// True if the identity account was created by this run
    pub account_created: bool,
    pub brand_id: Uuid,
    pub product_id: Uuid,
    pub review_id: Uuid,
}

/// Returns the id of the identity account for `email`, creating it if needed
///
/// Returns `(id, created)`.
pub async fn ensure_identity_account(
    identity: &dyn IdentityProvider,
    email: &str,
    password: &str,
) -> Result<(String, bool), SeedError> {
    if let Some(account) = identity.find_account_by_email(email).await? {
        debug!(account_id = %account.id, "Reusing existing identity account");
        return Ok((account.id, false));
    }

    let account = identity.create_account(email, password).await?;
    info!(account_id = %account.id, provider = identity.name(), "Created identity account");
    Ok((account.id, true))
}

/// Seeds the demo user and a small catalogue
pub async fn seed(
    pool: &PgPool,
    identity: &dyn IdentityProvider,
    email: &str,
    password: &str,
) -> Result<SeedReport, SeedError> {
    let email = email.trim().to_lowercase();
    let (user_id, account_created) = ensure_identity_account(identity, &email, password).await?;

    if User::delete_by_email(pool, &email).await? {
        debug!(email = %email, "Removed previous demo user");
    }

    let user = User::create(
        pool,
        CreateUser {
            id: user_id,
            email: email.clone(),
            username: DEMO_USERNAME.to_string(),
            password_hash: hash_password(password)?,
        },
    )
    .await?;

    UserProfile::create(
        pool,
        &user.id,
        ProfileFields {
            bio: Some("This is a bio".to_string()),
            avatar_url: Some("http://example.com/avatar.png".to_string()),
        },
    )
    .await?;

    let brand = Brand::find_or_create(pool, DEMO_BRAND).await?;

    let product = Product::create(
        pool,
        CreateProduct {
            brand_id: brand.id,
            name: DEMO_PRODUCT.to_string(),
            description: Some("This is a test product.".to_string()),
            tags: DEMO_TAGS.iter().map(|t| t.to_string()).collect(),
        },
    )
    .await?;

    let review = Review::create(
        pool,
        CreateReview {
            user_id: user.id.clone(),
            product_id: product.id,
            rating: 5,
            comment: Some("Great product!".to_string()),
        },
    )
    .await?;

    Like::create(pool, &user.id, review.id).await?;

    Comment::create(
        pool,
        CreateComment {
            user_id: user.id.clone(),
            review_id: review.id,
            content: "I agree, this product is awesome!".to_string(),
        },
    )
    .await?;

    let wishlist = Wishlist::find_or_create_for_user(pool, &user.id).await?;
    wishlist.add_product(pool, product.id).await?;

    info!(user_id = %user.id, product_id = %product.id, "Database seeded");

    Ok(SeedReport {
        user_id: user.id,
        email: user.email,
        account_created,
        brand_id: brand.id,
        product_id: product.id,
        review_id: review.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfie_shared::identity::{MockCall, MockIdentityProvider};

    #[tokio::test]
    async fn test_creates_missing_account() {
        let identity = MockIdentityProvider::new();

        let (id, created) = ensure_identity_account(&identity, "hello@supabase.com", "supabase")
            .await
            .unwrap();

        assert_eq!(id, "u1");
        assert!(created);
        assert_eq!(identity.create_calls().await, 1);
    }

    #[tokio::test]
    async fn test_reuses_existing_account() {
        let identity = MockIdentityProvider::new();
        let existing = identity.insert_account("hello@supabase.com", "supabase").await;

        let (id, created) = ensure_identity_account(&identity, "hello@supabase.com", "supabase")
            .await
            .unwrap();

        assert_eq!(id, existing.id);
        assert!(!created);
        assert_eq!(
            identity.calls().await,
            vec![MockCall::FindAccountByEmail {
                email: "hello@supabase.com".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_provider_rejection_is_reported() {
        let identity = MockIdentityProvider::new();
        identity.fail_create(true);

        let err = ensure_identity_account(&identity, "hello@supabase.com", "supabase")
            .await
            .unwrap_err();

        assert!(matches!(err, SeedError::Identity(IdentityError::Rejected { .. })));
    }
}
