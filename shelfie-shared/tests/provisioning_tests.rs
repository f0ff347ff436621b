/// Account provisioning behaviour against the in-memory provider and store
///
/// Every test checks all three stores after the call: provider accounts,
/// local user rows and the compensating deletes that were issued.

use shelfie_shared::auth::store::{MemoryUserStore, UserStore};
use shelfie_shared::identity::{IdentityProvider, MockCall, MockIdentityProvider};
use shelfie_shared::models::user::CreateUser;
use shelfie_shared::provisioning::{AccountProvisioner, ProvisioningError};
use std::sync::Arc;

struct Harness {
    identity: Arc<MockIdentityProvider>,
    users: Arc<MemoryUserStore>,
    provisioner: AccountProvisioner,
}

fn harness() -> Harness {
    let identity = Arc::new(MockIdentityProvider::new());
    let users = Arc::new(MemoryUserStore::new());
    let provisioner = AccountProvisioner::new(identity.clone(), users.clone());

    Harness {
        identity,
        users,
        provisioner,
    }
}

#[tokio::test]
async fn test_account_creation_failure_touches_nothing() {
    let h = harness();
    h.identity.fail_create(true);

    let result = h.provisioner.provision("a@x.com", "longenough1").await;

    assert!(matches!(result, Err(ProvisioningError::AccountCreationFailed(_))));
    assert_eq!(h.identity.sign_in_calls().await, 0);
    assert!(h.identity.deleted_ids().await.is_empty());
    assert!(h.users.is_empty().await);
}

#[tokio::test]
async fn test_session_failure_deletes_account_once() {
    let h = harness();
    h.identity.fail_sign_in(true);

    let result = h.provisioner.provision("a@x.com", "longenough1").await;

    assert!(matches!(result, Err(ProvisioningError::SessionIssuanceFailed(_))));
    assert_eq!(h.identity.deleted_ids().await, vec!["u1".to_string()]);
    assert_eq!(h.identity.account_count().await, 0);
    assert!(h.users.is_empty().await);
}

#[tokio::test]
async fn test_concrete_scenario_sign_in_failure() {
    let h = harness();
    h.identity.fail_sign_in(true);

    let result = h.provisioner.provision("a@x.com", "longenough1").await;

    assert!(result.is_err());
    assert_eq!(
        h.identity.calls().await,
        vec![
            MockCall::CreateAccount {
                email: "a@x.com".to_string()
            },
            MockCall::SignIn {
                email: "a@x.com".to_string()
            },
            MockCall::DeleteAccount {
                account_id: "u1".to_string()
            },
        ]
    );
    assert_eq!(h.users.len().await, 0);
}

#[tokio::test]
async fn test_local_user_failure_deletes_account_once() {
    let h = harness();
    h.users.fail_create(true);

    let result = h.provisioner.provision("a@x.com", "longenough1").await;

    match result {
        Err(ProvisioningError::LocalUserCreationFailed(_)) => {}
        other => panic!("expected LocalUserCreationFailed, got {:?}", other),
    }
    assert_eq!(h.identity.deleted_ids().await, vec!["u1".to_string()]);
    assert!(!h.identity.has_account("u1").await);
    assert!(h.users.is_empty().await);
}

#[tokio::test]
async fn test_success_ids_line_up() {
    let h = harness();

    let session = h.provisioner.provision("a@x.com", "longenough1").await.unwrap();

    let users = h.users.users().await;
    assert_eq!(users.len(), 1);
    assert_eq!(session.user_id, "u1");
    assert_eq!(users[0].id, session.user_id);
    assert!(h.identity.has_account(&session.user_id).await);
    assert!(h.identity.deleted_ids().await.is_empty());
}

#[tokio::test]
async fn test_email_is_stored_lowercase() {
    let h = harness();

    h.provisioner.provision("Mixed@X.com", "longenough1").await.unwrap();

    let found = h.users.find_by_email("mixed@x.com").await.unwrap().unwrap();
    assert_eq!(found.email, "mixed@x.com");
}

#[tokio::test]
async fn test_no_internal_deduplication() {
    let h = harness();

    h.provisioner.provision("a@x.com", "longenough1").await.unwrap();
    let second = h.provisioner.provision("a@x.com", "longenough1").await;

    // The second run goes straight to the provider, which refuses the email.
    assert_eq!(h.identity.create_calls().await, 2);
    assert!(matches!(second, Err(ProvisioningError::AccountCreationFailed(_))));
    assert_eq!(h.users.len().await, 1);
}

#[tokio::test]
async fn test_local_unique_constraint_is_the_safety_net() {
    let h = harness();
    h.provisioner.provision("a@x.com", "longenough1").await.unwrap();

    // The provider forgets the account but the local row survives.
    h.identity.delete_account("u1").await.unwrap();

    let result = h.provisioner.provision("a@x.com", "longenough1").await;

    assert!(matches!(result, Err(ProvisioningError::LocalUserCreationFailed(_))));
    assert_eq!(
        h.identity.deleted_ids().await,
        vec!["u1".to_string(), "u2".to_string()]
    );
    assert_eq!(h.users.len().await, 1);
}

#[tokio::test]
async fn test_mismatched_session_is_rejected() {
    let h = harness();
    h.identity.override_session_user(Some("someone-else"));

    let result = h.provisioner.provision("a@x.com", "longenough1").await;

    assert!(matches!(result, Err(ProvisioningError::SessionIssuanceFailed(_))));
    assert_eq!(h.identity.deleted_ids().await, vec!["u1".to_string()]);
    assert!(h.users.is_empty().await);
}

#[tokio::test]
async fn test_compensation_failure_is_swallowed() {
    let h = harness();
    h.identity.fail_sign_in(true);
    h.identity.fail_delete(true);

    let result = h.provisioner.provision("a@x.com", "longenough1").await;

    assert!(matches!(result, Err(ProvisioningError::SessionIssuanceFailed(_))));
    assert_eq!(h.identity.deleted_ids().await.len(), 1);
    // The orphaned provider account is left behind.
    assert!(h.identity.has_account("u1").await);
    assert!(h.users.is_empty().await);
}

#[tokio::test]
async fn test_concurrent_provisioning_of_different_emails() {
    let h = harness();

    let (a, b, c) = tokio::join!(
        h.provisioner.provision("a@x.com", "longenough1"),
        h.provisioner.provision("b@x.com", "longenough1"),
        h.provisioner.provision("c@x.com", "longenough1"),
    );

    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(h.users.len().await, 3);
    assert_eq!(h.identity.account_count().await, 3);
}

#[tokio::test]
async fn test_try_create_user_success() {
    let h = harness();
    let account = h.identity.insert_account("oauth@x.com", "irrelevant").await;

    let user = h
        .provisioner
        .try_create_user(&account.id, "oauth@x.com", "longenough1")
        .await
        .unwrap();

    assert_eq!(user.id, account.id);
    assert!(h.identity.deleted_ids().await.is_empty());
}

#[tokio::test]
async fn test_try_create_user_failure_deletes_account() {
    let h = harness();
    let account = h.identity.insert_account("oauth@x.com", "irrelevant").await;
    h.users
        .create_user(CreateUser {
            id: "other".to_string(),
            email: "oauth@x.com".to_string(),
            username: String::new(),
            password_hash: "$argon2id$hash".to_string(),
        })
        .await
        .unwrap();

    let result = h
        .provisioner
        .try_create_user(&account.id, "oauth@x.com", "longenough1")
        .await;

    assert!(matches!(result, Err(ProvisioningError::LocalUserCreationFailed(_))));
    assert_eq!(h.identity.deleted_ids().await, vec![account.id]);
}

#[tokio::test]
async fn test_try_create_user_twice_keeps_account() {
    let h = harness();
    let account = h.identity.create_account("a@x.com", "longenough1").await.unwrap();

    let first = h
        .provisioner
        .try_create_user(&account.id, "a@x.com", "longenough1")
        .await
        .unwrap();
    let second = h
        .provisioner
        .try_create_user(&account.id, "a@x.com", "longenough1")
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(h.users.len().await, 1);
    assert!(h.identity.deleted_ids().await.is_empty());
    assert!(h.identity.has_account(&account.id).await);
}

#[tokio::test]
async fn test_try_create_user_after_provider_email_change_keeps_account() {
    let h = harness();
    let account = h.identity.insert_account("new@x.com", "irrelevant").await;
    h.users
        .create_user(CreateUser {
            id: account.id.clone(),
            email: "old@x.com".to_string(),
            username: String::new(),
            password_hash: "$argon2id$hash".to_string(),
        })
        .await
        .unwrap();

    let user = h
        .provisioner
        .try_create_user(&account.id, "new@x.com", "longenough1")
        .await
        .unwrap();

    assert_eq!(user.email, "old@x.com");
    assert!(h.identity.deleted_ids().await.is_empty());
    assert!(h.identity.has_account(&account.id).await);
}

#[tokio::test]
async fn test_error_does_not_leak_provider_details() {
    let h = harness();
    h.identity.fail_sign_in(true);

    let err = h.provisioner.provision("a@x.com", "longenough1").await.unwrap_err();

    assert_eq!(err.code(), "create-session-error");
    assert!(!err.public_message().contains("connection reset"));
    assert!(err.to_string().contains("connection reset"));
}
