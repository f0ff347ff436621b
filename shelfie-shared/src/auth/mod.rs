/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id hashing for the local password copy
/// - [`session`]: signed session cookie carrying the provider session
/// - [`store`]: the local user store seam used by provisioning
///
/// # Example
///
/// ```no_run
/// use shelfie_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("longenough1")?;
/// assert!(verify_password("longenough1", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod session;
pub mod store;
