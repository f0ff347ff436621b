//! Seeding against a real database (with the mock identity provider)
//!
//! Run with `cargo test -p shelfie-seed -- --ignored` and `DATABASE_URL` set.

use shelfie_seed::seed;
use shelfie_shared::db::{
    migrations::run_migrations,
    pool::{create_pool, DatabaseConfig},
};
use shelfie_shared::identity::MockIdentityProvider;
use shelfie_shared::models::{
    like::Like,
    product::Product,
    review::Review,
    user::User,
    user_profile::UserProfile,
    wishlist::Wishlist,
};
use sqlx::PgPool;

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = create_pool(DatabaseConfig {
        url,
        max_connections: 2,
        ..Default::default()
    })
    .await
    .expect("Failed to connect");
    run_migrations(&pool).await.expect("Failed to migrate");
    pool
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_seed_creates_demo_data() {
    let pool = test_pool().await;
    let identity = MockIdentityProvider::new();
    let email = format!("seed-{}@example.com", uuid::Uuid::new_v4());

    let report = seed(&pool, &identity, &email, "supabase").await.unwrap();

    assert!(report.account_created);
    let user = User::find_by_id(&pool, &report.user_id).await.unwrap().unwrap();
    assert_eq!(user.username, "supabase_user");
    assert_ne!(user.password_hash, "supabase");

    let profile = UserProfile::find_by_user_id(&pool, &user.id).await.unwrap().unwrap();
    assert_eq!(profile.profile.bio.as_deref(), Some("This is a bio"));

    let tags: Vec<String> = Product::tags_for(&pool, report.product_id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(tags, vec!["Hydrating", "Vegan"]);

    let review = Review::find_by_id(&pool, report.review_id).await.unwrap().unwrap();
    assert_eq!(review.rating, 5);
    assert_eq!(Like::count_for_review(&pool, review.id).await.unwrap(), 1);

    let wishlist = Wishlist::find_or_create_for_user(&pool, &user.id).await.unwrap();
    let products = wishlist.products(&pool).await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, report.product_id);

    User::delete(&pool, &user.id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_seed_is_rerunnable() {
    let pool = test_pool().await;
    let identity = MockIdentityProvider::new();
    let email = format!("seed-{}@example.com", uuid::Uuid::new_v4());

    let first = seed(&pool, &identity, &email, "supabase").await.unwrap();
    let second = seed(&pool, &identity, &email, "supabase").await.unwrap();

    assert_eq!(first.user_id, second.user_id);
    assert_eq!(first.brand_id, second.brand_id);
    assert!(!second.account_created);
    assert_eq!(identity.create_calls().await, 1);

    // The first run's review went with the old user row.
    assert!(Review::find_by_id(&pool, first.review_id).await.unwrap().is_none());

    User::delete(&pool, &second.user_id).await.unwrap();
}
