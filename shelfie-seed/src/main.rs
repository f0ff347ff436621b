//! # Shelfie Seed
//!
//! ```bash
//! cargo run -p shelfie-seed
//! ```

use shelfie_seed::{seed, SeedConfig};
use shelfie_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use shelfie_shared::identity::GoTrueClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelfie_seed=debug,shelfie_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SeedConfig::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database_url.clone(),
        max_connections: 2,
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    let identity = GoTrueClient::new(config.identity.clone())?;

    let result = seed(&pool, &identity, &config.email, &config.password).await;
    close_pool(pool).await;

    let report = result?;
    tracing::info!(
        user_id = %report.user_id,
        email = %report.email,
        account_created = report.account_created,
        "Database has been seeded; sign in with the seeded credentials"
    );

    Ok(())
}
