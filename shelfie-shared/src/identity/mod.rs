/// Identity provider integration
///
/// # Modules
///
/// - [`provider`]: the `IdentityProvider` trait and its account/session types
/// - [`gotrue`]: GoTrue (Supabase Auth) HTTP client
/// - [`mock`]: in-memory provider with failure injection and call recording

pub mod gotrue;
pub mod mock;
pub mod provider;

pub use gotrue::{GoTrueClient, GoTrueConfig};
pub use mock::{MockCall, MockIdentityProvider};
pub use provider::{AuthSession, IdentityAccount, IdentityError, IdentityProvider, IdentityResult};
