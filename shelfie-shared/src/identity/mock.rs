/// In-memory identity provider for tests and local demos
///
/// Behaves like a real provider in the ways the provisioning saga cares about:
///
/// - account ids are opaque and assigned by the provider (`u1`, `u2`, ...)
/// - duplicate emails are rejected
/// - sign-in requires the password the account was created with
///
/// Each operation can be told to fail, and every call is recorded so tests
/// can assert exactly which compensations ran.
///
/// # Example
///
/// ```
/// use shelfie_shared::identity::{IdentityProvider, MockIdentityProvider};
///
/// # async fn example() {
/// let provider = MockIdentityProvider::new();
/// provider.fail_sign_in(true);
///
/// let account = provider.create_account("a@x.com", "longenough1").await.unwrap();
/// assert_eq!(account.id, "u1");
/// assert!(provider.sign_in("a@x.com", "longenough1").await.is_err());
/// # }
/// ```

use crate::identity::{AuthSession, IdentityAccount, IdentityError, IdentityProvider, IdentityResult};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Access token lifetime handed out by the mock
const MOCK_EXPIRES_IN: i64 = 3600;

#[derive(Debug, Clone)]
struct StoredAccount {
    account: IdentityAccount,
    password: String,
}

/// Calls made against the mock, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    CreateAccount { email: String },
    SignIn { email: String },
    RefreshSession,
    DeleteAccount { account_id: String },
    FindAccountByEmail { email: String },
}

#[derive(Debug, Default)]
struct MockState {
    accounts: HashMap<String, StoredAccount>,
    refresh_tokens: HashMap<String, String>,
    calls: Vec<MockCall>,
}

/// Mock identity provider implementation
#[derive(Debug, Default)]
pub struct MockIdentityProvider {
    state: Mutex<MockState>,
    next_id: AtomicU64,
    next_token: AtomicU64,
    fail_create: AtomicBool,
    fail_sign_in: AtomicBool,
    fail_refresh: AtomicBool,
    fail_delete: AtomicBool,
    session_user_override: std::sync::Mutex<Option<String>>,
}

impl MockIdentityProvider {
    /// Creates an empty mock provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `create_account` fail with a rejection
    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Makes `sign_in` fail with a transport error
    pub fn fail_sign_in(&self, fail: bool) {
        self.fail_sign_in.store(fail, Ordering::SeqCst);
    }

    /// Makes `refresh_session` fail with a rejection
    pub fn fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }

    /// Makes `delete_account` fail with a transport error
    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Issues sessions bound to `user_id` instead of the signed-in account
    ///
    /// Simulates a provider that hands back a session for the wrong account.
    pub fn override_session_user(&self, user_id: Option<&str>) {
        if let Ok(mut guard) = self.session_user_override.lock() {
            *guard = user_id.map(str::to_string);
        }
    }

    /// Seeds an existing account without recording a call
    pub async fn insert_account(&self, email: &str, password: &str) -> IdentityAccount {
        let account = IdentityAccount {
            id: self.allocate_id(),
            email: email.to_string(),
        };

        let mut state = self.state.lock().await;
        state.accounts.insert(
            account.id.clone(),
            StoredAccount {
                account: account.clone(),
                password: password.to_string(),
            },
        );
        account
    }

    /// Issues a refresh token for `account_id` without recording a call
    ///
    /// Lets tests simulate the browser returning from an OAuth redirect.
    pub async fn issue_refresh_token(&self, account_id: &str) -> String {
        let token = format!("refresh-{}-oauth", account_id);
        let mut state = self.state.lock().await;
        state.refresh_tokens.insert(token.clone(), account_id.to_string());
        token
    }

    /// Returns all recorded calls
    pub async fn calls(&self) -> Vec<MockCall> {
        self.state.lock().await.calls.clone()
    }

    /// Returns the ids passed to `delete_account`, in order
    pub async fn deleted_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter_map(|call| match call {
                MockCall::DeleteAccount { account_id } => Some(account_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Counts recorded `create_account` calls
    pub async fn create_calls(&self) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| matches!(call, MockCall::CreateAccount { .. }))
            .count()
    }

    /// Counts recorded `sign_in` calls
    pub async fn sign_in_calls(&self) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| matches!(call, MockCall::SignIn { .. }))
            .count()
    }

    /// Returns true if an account with `id` currently exists
    pub async fn has_account(&self, id: &str) -> bool {
        self.state.lock().await.accounts.contains_key(id)
    }

    /// Number of accounts currently held
    pub async fn account_count(&self) -> usize {
        self.state.lock().await.accounts.len()
    }

    fn allocate_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("u{}", n)
    }

    fn session_for(&self, state: &mut MockState, account: &IdentityAccount) -> AuthSession {
        let user_id = self
            .session_user_override
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .unwrap_or_else(|| account.id.clone());

        let serial = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        let refresh_token = format!("refresh-{}-{}", account.id, serial);
        state
            .refresh_tokens
            .insert(refresh_token.clone(), account.id.clone());

        AuthSession {
            user_id,
            email: account.email.clone(),
            access_token: format!("access-{}", account.id),
            refresh_token,
            expires_in: MOCK_EXPIRES_IN,
            expires_at: Utc::now() + Duration::seconds(MOCK_EXPIRES_IN),
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_account(&self, email: &str, password: &str) -> IdentityResult<IdentityAccount> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::CreateAccount {
            email: email.to_string(),
        });

        if self.fail_create.load(Ordering::SeqCst) {
            return Err(IdentityError::Rejected {
                status: 422,
                message: "Password should be at least 6 characters".to_string(),
            });
        }

        let duplicate = state
            .accounts
            .values()
            .any(|stored| stored.account.email.eq_ignore_ascii_case(email));
        if duplicate {
            return Err(IdentityError::Rejected {
                status: 422,
                message: "A user with this email address has already been registered".to_string(),
            });
        }

        let account = IdentityAccount {
            id: self.allocate_id(),
            email: email.to_string(),
        };
        state.accounts.insert(
            account.id.clone(),
            StoredAccount {
                account: account.clone(),
                password: password.to_string(),
            },
        );

        Ok(account)
    }

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<AuthSession> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::SignIn {
            email: email.to_string(),
        });

        if self.fail_sign_in.load(Ordering::SeqCst) {
            return Err(IdentityError::Transport("connection reset by peer".to_string()));
        }

        let account = state
            .accounts
            .values()
            .find(|stored| stored.account.email.eq_ignore_ascii_case(email) && stored.password == password)
            .map(|stored| stored.account.clone())
            .ok_or_else(|| IdentityError::Rejected {
                status: 400,
                message: "Invalid login credentials".to_string(),
            })?;

        Ok(self.session_for(&mut state, &account))
    }

    async fn refresh_session(&self, refresh_token: &str) -> IdentityResult<AuthSession> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::RefreshSession);

        let invalid = || IdentityError::Rejected {
            status: 400,
            message: "Invalid Refresh Token".to_string(),
        };

        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(invalid());
        }

        let account_id = state.refresh_tokens.remove(refresh_token).ok_or_else(invalid)?;
        let account = state
            .accounts
            .get(&account_id)
            .map(|stored| stored.account.clone())
            .ok_or_else(invalid)?;

        Ok(self.session_for(&mut state, &account))
    }

    async fn delete_account(&self, account_id: &str) -> IdentityResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::DeleteAccount {
            account_id: account_id.to_string(),
        });

        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(IdentityError::Transport("request timed out".to_string()));
        }

        state
            .accounts
            .remove(account_id)
            .map(|_| ())
            .ok_or(IdentityError::NotFound)
    }

    async fn find_account_by_email(&self, email: &str) -> IdentityResult<Option<IdentityAccount>> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::FindAccountByEmail {
            email: email.to_string(),
        });

        Ok(state
            .accounts
            .values()
            .find(|stored| stored.account.email.eq_ignore_ascii_case(email))
            .map(|stored| stored.account.clone()))
    }
}
