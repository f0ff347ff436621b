//! # Shelfie API Server
//!
//! ```bash
//! cargo run -p shelfie-api
//! ```
//!
//! Configuration comes from the environment (and `.env`); see
//! [`shelfie_api::config`].

use shelfie_api::{app, config::Config};
use shelfie_shared::db::{migrations::run_migrations, pool::close_pool};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelfie_api=debug,shelfie_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Shelfie API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let bind_address = config.bind_address();

    let state = app::AppState::from_config(config).await?;
    run_migrations(&state.db).await?;

    let db = state.db.clone();
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(db).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
