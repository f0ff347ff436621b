/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use shelfie_api::{app::AppState, config::Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::from_config(config).await?;
/// let app = shelfie_api::app::build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, middleware::session::session_auth_layer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use shelfie_shared::auth::store::{PgUserStore, UserStore};
use shelfie_shared::db::pool::{create_pool, DatabaseConfig};
use shelfie_shared::identity::{GoTrueClient, IdentityProvider};
use shelfie_shared::provisioning::AccountProvisioner;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler via `State`; everything inside is behind `Arc`
/// or is itself cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Account provisioning (identity provider + local user store)
    pub provisioner: Arc<AccountProvisioner>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, provisioner: AccountProvisioner) -> Self {
        Self {
            db,
            config: Arc::new(config),
            provisioner: Arc::new(provisioner),
        }
    }

    /// Connects to Postgres and GoTrue as configured
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let db = create_pool(DatabaseConfig {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            ..Default::default()
        })
        .await?;

        let identity: Arc<dyn IdentityProvider> = Arc::new(GoTrueClient::new(config.identity.gotrue())?);
        let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(db.clone()));

        Ok(Self::new(db, config, AccountProvisioner::new(identity, users)))
    }

    pub fn session_secret(&self) -> &str {
        &self.config.session.secret
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        self.provisioner.identity()
    }

    pub fn users(&self) -> &Arc<dyn UserStore> {
        self.provisioner.users()
    }
}

/// Builds the complete router
///
/// ```text
/// /
/// ├── GET /health
/// └── /v1/
///     ├── /auth/                         public
///     │   ├── POST /register
///     │   ├── POST /login
///     │   ├── POST /callback
///     │   └── POST /logout
///     ├── GET  /brands                   public
///     ├── GET  /products                 public
///     ├── GET  /products/:id             public
///     ├── GET  /reviews/:id/comments     public
///     ├── GET|PUT|DELETE /profile        session
///     ├── GET  /profiles                 session
///     ├── POST /products/:id/reviews     session
///     ├── POST /reviews/:id/comments     session
///     ├── POST|DELETE /reviews/:id/like  session
///     ├── GET  /wishlist                 session
///     └── PUT|DELETE /wishlist/products/:id   session
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/callback", post(routes::auth::callback))
        .route("/logout", post(routes::auth::logout));

    let public_routes = Router::new()
        .route("/brands", get(routes::catalog::list_brands))
        .route("/products", get(routes::catalog::list_products))
        .route("/products/:id", get(routes::catalog::get_product))
        .route("/reviews/:id/comments", get(routes::reviews::list_comments));

    let session_routes = Router::new()
        .route(
            "/profile",
            get(routes::profile::get_profile)
                .put(routes::profile::update_profile)
                .delete(routes::profile::delete_profile),
        )
        .route("/profiles", get(routes::profile::list_profiles))
        .route("/products/:id/reviews", post(routes::reviews::create_review))
        .route("/reviews/:id/comments", post(routes::reviews::create_comment))
        .route(
            "/reviews/:id/like",
            post(routes::reviews::like_review).delete(routes::reviews::unlike_review),
        )
        .route("/wishlist", get(routes::wishlist::get_wishlist))
        .route(
            "/wishlist/products/:id",
            put(routes::wishlist::add_to_wishlist).delete(routes::wishlist::remove_from_wishlist),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(public_routes)
        .merge(session_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Credentials are needed for the session cookie.
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
