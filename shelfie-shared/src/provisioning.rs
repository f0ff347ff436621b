/// Account provisioning
///
/// Creating a Shelfie account touches two stores that share no transaction:
/// the identity provider (account + session) and the local `users` table.
/// [`AccountProvisioner::provision`] runs the three steps as a [`Saga`]:
///
/// | # | Step | Compensation |
/// |---|------|--------------|
/// | 1 | `create_account` | delete the identity account |
/// | 2 | `issue_session` | none (sessions are stateless tokens) |
/// | 3 | `create_local_user` | none (last step) |
///
/// Either all three succeed and the session is returned, or the identity
/// account is deleted (best-effort) and no local row exists. Deletion
/// failures are logged and swallowed; an orphaned provider account is
/// recoverable, an orphaned local row is not.
///
/// The provisioner does not check whether the email is already registered.
/// Callers look the user up first and take the sign-in path instead; two
/// concurrent registrations for one email are only stopped by the unique
/// constraints of the two stores.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use shelfie_shared::auth::store::MemoryUserStore;
/// use shelfie_shared::identity::MockIdentityProvider;
/// use shelfie_shared::provisioning::AccountProvisioner;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provisioner = AccountProvisioner::new(
///     Arc::new(MockIdentityProvider::new()),
///     Arc::new(MemoryUserStore::new()),
/// );
///
/// let session = provisioner.provision("a@x.com", "longenough1").await?;
/// println!("Provisioned {}", session.user_id);
/// # Ok(())
/// # }
/// ```

use crate::auth::password::{hash_password, is_password_hash, PasswordError};
use crate::auth::store::{StoreError, UserStore};
use crate::identity::{AuthSession, IdentityAccount, IdentityError, IdentityProvider};
use crate::models::user::{CreateUser, User};
use crate::saga::{Saga, SagaStep};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Why provisioning stopped
///
/// The `Display` text is safe to log but not meant for end users; use
/// [`ProvisioningError::code`] and [`ProvisioningError::public_message`] for
/// responses.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// The identity provider did not create the account. Nothing to undo.
    #[error("Identity account creation failed: {0}")]
    AccountCreationFailed(#[source] IdentityError),

    /// No usable session for the new account. The account was deleted.
    #[error("Session issuance failed: {0}")]
    SessionIssuanceFailed(String),

    /// The local user row was not created. The account was deleted.
    #[error("Local user creation failed: {0}")]
    LocalUserCreationFailed(String),
}

impl ProvisioningError {
    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ProvisioningError::AccountCreationFailed(_) => "create-account-error",
            ProvisioningError::SessionIssuanceFailed(_) => "create-session-error",
            ProvisioningError::LocalUserCreationFailed(_) => "create-user-error",
        }
    }

    /// Generic message that reveals nothing about the provider or database
    pub fn public_message(&self) -> &'static str {
        match self {
            ProvisioningError::AccountCreationFailed(_) => "We could not create your account",
            ProvisioningError::SessionIssuanceFailed(_) => "We could not sign you in",
            ProvisioningError::LocalUserCreationFailed(_) => "We could not finish setting up your account",
        }
    }
}

/// State threaded through the provisioning steps
#[derive(Debug)]
pub struct ProvisioningContext {
    pub email: String,
    pub password: String,
    pub account: Option<IdentityAccount>,
    pub session: Option<AuthSession>,
    pub user: Option<User>,
}

impl ProvisioningContext {
    fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            account: None,
            session: None,
            user: None,
        }
    }

    fn account_id(&self) -> Result<&str, String> {
        self.account
            .as_ref()
            .map(|a| a.id.as_str())
            .ok_or_else(|| "no identity account in context".to_string())
    }
}

/// Deletes an identity account, logging instead of failing
async fn delete_account_best_effort(identity: &dyn IdentityProvider, account_id: &str) {
    match identity.delete_account(account_id).await {
        Ok(()) => {
            tracing::info!(account_id = %account_id, "Deleted identity account");
        }
        Err(e) => {
            tracing::error!(
                account_id = %account_id,
                provider = identity.name(),
                error = %e,
                "Failed to delete identity account, leaving it orphaned"
            );
        }
    }
}

struct CreateAccount {
    identity: Arc<dyn IdentityProvider>,
}

#[async_trait]
impl SagaStep<ProvisioningContext, ProvisioningError> for CreateAccount {
    fn name(&self) -> &'static str {
        "create_account"
    }

    async fn execute(&self, ctx: &mut ProvisioningContext) -> Result<(), ProvisioningError> {
        let account = self
            .identity
            .create_account(&ctx.email, &ctx.password)
            .await
            .map_err(ProvisioningError::AccountCreationFailed)?;

        tracing::debug!(account_id = %account.id, "Identity account created");
        ctx.account = Some(account);
        Ok(())
    }

    async fn compensate(&self, ctx: &mut ProvisioningContext) {
        if let Some(account) = ctx.account.take() {
            delete_account_best_effort(self.identity.as_ref(), &account.id).await;
        }
    }
}

struct IssueSession {
    identity: Arc<dyn IdentityProvider>,
}

#[async_trait]
impl SagaStep<ProvisioningContext, ProvisioningError> for IssueSession {
    fn name(&self) -> &'static str {
        "issue_session"
    }

    async fn execute(&self, ctx: &mut ProvisioningContext) -> Result<(), ProvisioningError> {
        let account_id = ctx
            .account_id()
            .map_err(ProvisioningError::SessionIssuanceFailed)?
            .to_string();

        let session = self
            .identity
            .sign_in(&ctx.email, &ctx.password)
            .await
            .map_err(|e| ProvisioningError::SessionIssuanceFailed(e.to_string()))?;

        // The local row is keyed by the session's user id, so it must be the
        // account we just created.
        if session.user_id != account_id {
            return Err(ProvisioningError::SessionIssuanceFailed(format!(
                "session belongs to {} instead of {}",
                session.user_id, account_id
            )));
        }

        ctx.session = Some(session);
        Ok(())
    }
}

struct CreateLocalUser {
    users: Arc<dyn UserStore>,
}

#[async_trait]
impl SagaStep<ProvisioningContext, ProvisioningError> for CreateLocalUser {
    fn name(&self) -> &'static str {
        "create_local_user"
    }

    async fn execute(&self, ctx: &mut ProvisioningContext) -> Result<(), ProvisioningError> {
        let user_id = ctx
            .session
            .as_ref()
            .map(|s| s.user_id.clone())
            .ok_or_else(|| ProvisioningError::LocalUserCreationFailed("no session in context".to_string()))?;

        let user = create_local_user(self.users.as_ref(), &user_id, &ctx.email, &ctx.password)
            .await
            .map_err(|e| ProvisioningError::LocalUserCreationFailed(e.to_string()))?;

        ctx.user = Some(user);
        Ok(())
    }
}

#[derive(Debug, Error)]
enum LocalUserError {
    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Hashes the password once and inserts the local row
async fn create_local_user(
    users: &dyn UserStore,
    user_id: &str,
    email: &str,
    password: &str,
) -> Result<User, LocalUserError> {
    let password_hash = hash_password(password)?;

    let user = users
        .create_user(CreateUser {
            id: user_id.to_string(),
            email: email.to_lowercase(),
            username: String::new(),
            password_hash,
        })
        .await?;

    Ok(user)
}

/// Creates accounts across the identity provider and the local store
pub struct AccountProvisioner {
    identity: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserStore>,
    saga: Saga<ProvisioningContext, ProvisioningError>,
}

impl AccountProvisioner {
    pub fn new(identity: Arc<dyn IdentityProvider>, users: Arc<dyn UserStore>) -> Self {
        let saga = Saga::new("account_provisioning")
            .step(CreateAccount {
                identity: identity.clone(),
            })
            .step(IssueSession {
                identity: identity.clone(),
            })
            .step(CreateLocalUser { users: users.clone() });

        Self { identity, users, saga }
    }

    /// The identity provider this provisioner talks to
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    /// The local user store this provisioner writes to
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    /// Step names in execution order
    pub fn steps(&self) -> Vec<&'static str> {
        self.saga.step_names()
    }

    /// Provisions a new account and returns its session
    ///
    /// `password` is the plaintext password. It is sent to the provider as-is
    /// and hashed exactly once for the local copy.
    ///
    /// # Errors
    ///
    /// - `AccountCreationFailed`: nothing was created
    /// - `SessionIssuanceFailed`: the identity account was deleted
    /// - `LocalUserCreationFailed`: the identity account was deleted
    pub async fn provision(&self, email: &str, password: &str) -> Result<AuthSession, ProvisioningError> {
        if is_password_hash(password) {
            tracing::warn!(email = %email, "Provisioning called with a value that is already a password hash");
        }

        let mut ctx = ProvisioningContext::new(email, password);
        self.saga.run(&mut ctx).await?;

        let session = ctx.session.take().ok_or_else(|| {
            ProvisioningError::SessionIssuanceFailed("saga completed without a session".to_string())
        })?;

        tracing::info!(user_id = %session.user_id, email = %email, "Account provisioned");
        Ok(session)
    }

    /// Creates the local row for an account that already has a session
    ///
    /// Used when the user arrives from an OAuth redirect: the identity account
    /// and session already exist. If the row can't be created the identity
    /// account is deleted so the user can start over, unless a row for
    /// `account_id` already exists (a repeated callback, or an email changed
    /// at the provider). That row is returned and the account is kept.
    pub async fn try_create_user(
        &self,
        account_id: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ProvisioningError> {
        if is_password_hash(password) {
            tracing::warn!(email = %email, "try_create_user called with a value that is already a password hash");
        }

        let err = match create_local_user(self.users.as_ref(), account_id, email, password).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Local user created");
                return Ok(user);
            }
            Err(err) => err,
        };

        if let LocalUserError::Store(StoreError::Duplicate(_)) = err {
            match self.users.find_by_id(account_id).await {
                Ok(Some(existing)) => {
                    tracing::info!(user_id = %existing.id, "Local user already exists for account");
                    return Ok(existing);
                }
                Ok(None) => {}
                Err(lookup) => {
                    // Can't tell whether the account is in use; keep it.
                    tracing::warn!(account_id = %account_id, error = %lookup, "Could not check for an existing local user");
                    return Err(ProvisioningError::LocalUserCreationFailed(err.to_string()));
                }
            }
        }

        tracing::warn!(account_id = %account_id, error = %err, "Local user creation failed");
        delete_account_best_effort(self.identity.as_ref(), account_id).await;
        Err(ProvisioningError::LocalUserCreationFailed(err.to_string()))
    }
}
