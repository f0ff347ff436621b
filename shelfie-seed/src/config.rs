/// Seeder configuration, read from the same environment as the API server

use shelfie_shared::identity::GoTrueConfig;
use std::env;

/// Demo account created by the seeder
pub const DEMO_EMAIL: &str = "hello@supabase.com";
pub const DEMO_PASSWORD: &str = "supabase";

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub database_url: String,
    pub identity: GoTrueConfig,
    pub email: String,
    pub password: String,
}

impl SeedConfig {
    /// Loads from the process environment (and `.env`)
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads from an arbitrary key lookup
    ///
    /// `SEED_EMAIL` / `SEED_PASSWORD` override the demo credentials.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        let timeout_secs = match lookup("IDENTITY_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("IDENTITY_TIMEOUT_SECS must be a number"))?,
            None => 10,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            identity: GoTrueConfig {
                url: required("SUPABASE_URL")?,
                anon_key: required("SUPABASE_ANON_KEY")?,
                service_role_key: required("SUPABASE_SERVICE_ROLE")?,
                timeout_secs,
            },
            email: lookup("SEED_EMAIL").unwrap_or_else(|| DEMO_EMAIL.to_string()),
            password: lookup("SEED_PASSWORD").unwrap_or_else(|| DEMO_PASSWORD.to_string()),
        })
    }
}
