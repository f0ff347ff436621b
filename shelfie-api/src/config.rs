/// Configuration management for the API server
///
/// Loaded from environment variables (and a `.env` file in development).
///
/// # Environment Variables
///
/// | Variable | Default | |
/// |----------|---------|-|
/// | `API_HOST` | `0.0.0.0` | |
/// | `API_PORT` | `8080` | |
/// | `CORS_ORIGINS` | `*` | comma-separated |
/// | `PRODUCTION` | `false` | enables HSTS and `Secure` cookies |
/// | `DATABASE_URL` | | required |
/// | `DATABASE_MAX_CONNECTIONS` | `10` | |
/// | `SESSION_SECRET` | | required, at least 32 characters |
/// | `SESSION_MAX_AGE_SECS` | `604800` | cookie and token lifetime |
/// | `SUPABASE_URL` | | required |
/// | `SUPABASE_ANON_KEY` | | required |
/// | `SUPABASE_SERVICE_ROLE` | | required |
/// | `IDENTITY_TIMEOUT_SECS` | `10` | per-request timeout |
///
/// # Example
///
/// ```no_run
/// use shelfie_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use shelfie_shared::auth::session::DEFAULT_COOKIE_NAME;
use shelfie_shared::identity::GoTrueConfig;
use std::env;
use std::str::FromStr;

/// Minimum session secret length
pub const MIN_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub identity: IdentityConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS, `Secure` cookies)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// HS256 signing secret
    ///
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,

    /// Cookie and token lifetime in seconds
    pub max_age_secs: i64,

    pub cookie_name: String,
}

/// Identity provider (Supabase Auth) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub url: String,

    #[serde(skip_serializing)]
    pub anon_key: String,

    #[serde(skip_serializing)]
    pub service_role_key: String,

    pub timeout_secs: u64,
}

impl IdentityConfig {
    pub fn gotrue(&self) -> GoTrueConfig {
        GoTrueConfig {
            url: self.url.clone(),
            anon_key: self.anon_key.clone(),
            service_role_key: self.service_role_key.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

impl SessionConfig {
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_age_secs)
    }
}

fn required<F>(lookup: &F, key: &str) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value can't be
    /// parsed
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let session_secret = required(&lookup, "SESSION_SECRET")?;
        if session_secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!(
                "SESSION_SECRET must be at least {} characters long",
                MIN_SECRET_LENGTH
            );
        }

        let max_age_secs = parsed(&lookup, "SESSION_MAX_AGE_SECS", 7 * 24 * 60 * 60i64)?;
        if max_age_secs <= 0 {
            anyhow::bail!("SESSION_MAX_AGE_SECS must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parsed(&lookup, "API_PORT", 8080u16)?,
                cors_origins,
                production: parsed(&lookup, "PRODUCTION", false)?,
            },
            database: DatabaseConfig {
                url: required(&lookup, "DATABASE_URL")?,
                max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?,
            },
            session: SessionConfig {
                secret: session_secret,
                max_age_secs,
                cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            },
            identity: IdentityConfig {
                url: required(&lookup, "SUPABASE_URL")?,
                anon_key: required(&lookup, "SUPABASE_ANON_KEY")?,
                service_role_key: required(&lookup, "SUPABASE_SERVICE_ROLE")?,
                timeout_secs: parsed(&lookup, "IDENTITY_TIMEOUT_SECS", 10u64)?,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
