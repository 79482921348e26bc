use std::sync::Arc;
use std::time::Duration;

use iotsoc::error::AuthError;
use iotsoc::identity::{has_permission, Authenticator, DemoCredentials, Identity, RequiredRoles, Role, SessionPhase, SessionStore};
use iotsoc::storage::{ClientStorage, FileStorage, MemoryStorage, TOKEN_KEY, USER_KEY};
use iotsoc::ConsoleConfig;

fn instant_auth() -> Authenticator { Authenticator::default().with_latency(Duration::ZERO) }

async fn open_over(storage: &MemoryStorage) -> Arc<SessionStore> {
    SessionStore::open(Arc::new(storage.clone()), instant_auth(), &ConsoleConfig::default()).await
}

#[tokio::test]
async fn every_registered_account_signs_in() -> anyhow::Result<()> {
    let demo = DemoCredentials::new();
    for name in demo.login_names() {
        let record = demo.lookup(name).expect("registered");
        let storage = MemoryStorage::new();
        let store = open_over(&storage).await;
        let ident = store.login(name, &record.secret).await?;
        assert!(store.is_authenticated(), "{name} should be signed in");
        assert_eq!(ident.role, record.identity.role);
        assert_eq!(ident.username, name);
    }
    Ok(())
}

#[tokio::test]
async fn bad_secrets_and_unknown_names_are_refused() {
    let storage = MemoryStorage::new();
    let store = open_over(&storage).await;
    for (name, secret) in [("admin", "wrong"), ("admin", ""), ("nobody", "admin123"), ("", "")] {
        let err = store.login(name, secret).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert!(!store.is_authenticated());
    }
    assert!(storage.is_empty());
}

#[tokio::test]
async fn logout_twice_matches_logout_once() -> anyhow::Result<()> {
    let storage = MemoryStorage::new();
    let store = open_over(&storage).await;
    store.login("secadmin", "sec123").await?;
    store.logout();
    let once = store.snapshot();
    assert!(!storage.contains(USER_KEY) && !storage.contains(TOKEN_KEY));
    store.logout();
    assert_eq!(store.snapshot(), once);
    assert_eq!(store.phase(), SessionPhase::Unauthenticated);
    assert!(storage.is_empty());
    assert_eq!(store.token(), None);
    Ok(())
}

#[tokio::test]
async fn reload_restores_the_signed_in_identity() -> anyhow::Result<()> {
    let storage = MemoryStorage::new();
    let first = open_over(&storage).await;
    let ident = first.login("operator", "op123").await?;
    assert!(ident.last_login.is_some());
    let token = first.token();

    let reloaded = open_over(&storage).await;
    assert_eq!(reloaded.phase(), SessionPhase::Authenticated);
    assert_eq!(reloaded.identity(), Some(ident));
    assert_eq!(reloaded.token(), token);
    Ok(())
}

#[tokio::test]
async fn reload_from_disk_survives_a_new_store() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session.json");
    let ident = {
        let store = SessionStore::open(Arc::new(FileStorage::new(&path)), instant_auth(), &ConsoleConfig::default()).await;
        store.login("analyst", "analyst123").await?
    };
    let store = SessionStore::open(Arc::new(FileStorage::new(&path)), instant_auth(), &ConsoleConfig::default()).await;
    assert_eq!(store.identity(), Some(ident));
    store.logout();
    let fresh = FileStorage::new(&path);
    assert_eq!(fresh.get(USER_KEY)?, None);
    assert_eq!(fresh.get(TOKEN_KEY)?, None);
    Ok(())
}

#[tokio::test]
async fn malformed_identity_is_cleared_on_open() -> anyhow::Result<()> {
    let storage = MemoryStorage::new();
    storage.set(USER_KEY, "{\"id\": \"usr-001\", \"role\": ")?;
    storage.set(TOKEN_KEY, "abc")?;
    let store = open_over(&storage).await;
    assert_eq!(store.phase(), SessionPhase::Unauthenticated);
    assert_eq!(store.identity(), None);
    assert!(!storage.contains(USER_KEY));
    assert!(!storage.contains(TOKEN_KEY));
    Ok(())
}

#[tokio::test]
async fn unknown_role_in_storage_counts_as_corruption() -> anyhow::Result<()> {
    let storage = MemoryStorage::new();
    let bogus = r#"{"id":"usr-1","username":"x","email":"x@y","fullName":"X","role":"root","createdAt":"2024-01-01T00:00:00Z"}"#;
    storage.set(USER_KEY, bogus)?;
    storage.set(TOKEN_KEY, "abc")?;
    let store = open_over(&storage).await;
    assert!(!store.is_authenticated());
    assert!(storage.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn login_waits_out_the_configured_latency() -> anyhow::Result<()> {
    let storage = MemoryStorage::new();
    let store = SessionStore::open(Arc::new(storage.clone()), Authenticator::default(), &ConsoleConfig::default()).await;
    let started = tokio::time::Instant::now();
    store.login("admin", "admin123").await?;
    assert!(started.elapsed() >= Duration::from_millis(500));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn logout_during_pending_login_wins() {
    let storage = MemoryStorage::new();
    let store = SessionStore::open(Arc::new(storage.clone()), Authenticator::default(), &ConsoleConfig::default()).await;
    let pending = {
        let store = store.clone();
        tokio::spawn(async move { store.login("admin", "admin123").await })
    };
    // let the login get into its latency wait
    tokio::time::sleep(Duration::from_millis(100)).await;
    store.logout();

    let outcome = pending.await.expect("login task");
    assert_eq!(outcome, Err(AuthError::Superseded));
    assert!(!store.is_authenticated());
    assert!(storage.is_empty());
}

#[tokio::test(start_paused = true)]
async fn newer_login_supersedes_older_one() -> anyhow::Result<()> {
    let storage = MemoryStorage::new();
    let store = SessionStore::open(Arc::new(storage.clone()), Authenticator::default(), &ConsoleConfig::default()).await;
    let older = {
        let store = store.clone();
        tokio::spawn(async move { store.login("admin", "admin123").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let newer = store.login("analyst", "analyst123").await?;

    assert_eq!(older.await?, Err(AuthError::Superseded));
    assert_eq!(store.identity(), Some(newer));
    let persisted: Identity = serde_json::from_str(&storage.get(USER_KEY)?.unwrap_or_default())?;
    assert_eq!(persisted.role, Role::SecurityAnalyst);
    Ok(())
}

#[tokio::test]
async fn admin_scenario_and_rank_checks() -> anyhow::Result<()> {
    let storage = MemoryStorage::new();
    let store = open_over(&storage).await;
    assert_eq!(store.login("admin", "wrong").await, Err(AuthError::InvalidCredentials));
    let admin = store.login("admin", "admin123").await?;
    assert_eq!(admin.role, Role::SuperAdmin);
    assert!(store.has_permission(&RequiredRoles::of([Role::SecurityAnalyst])));

    let demo = DemoCredentials::new();
    let secadmin = demo.lookup("secadmin").map(|r| r.identity.clone());
    let operator = demo.lookup("operator").map(|r| r.identity.clone());
    assert!(has_permission(secadmin.as_ref(), &Role::NetworkOperator.into()));
    assert!(!has_permission(operator.as_ref(), &Role::SecurityAdmin.into()));
    Ok(())
}
