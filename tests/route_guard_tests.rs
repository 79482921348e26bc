use std::sync::Arc;
use std::time::Duration;

use iotsoc::identity::{Authenticator, GuardView, Location, Role, RouteGuard, SessionStore, LOGIN_PATH};
use iotsoc::routes::{post_login_target, Navigation, Page, Router};
use iotsoc::storage::MemoryStorage;
use iotsoc::ConsoleConfig;

async fn fresh_store() -> Arc<SessionStore> {
    let auth = Authenticator::default().with_latency(Duration::ZERO);
    SessionStore::open(Arc::new(MemoryStorage::new()), auth, &ConsoleConfig::default()).await
}

#[tokio::test]
async fn analyst_sees_own_pages_but_not_user_management() -> anyhow::Result<()> {
    let store = fresh_store().await;
    store.login("analyst", "analyst123").await?;
    let session = store.snapshot();

    let admin_only = RouteGuard::new(Role::SuperAdmin.into());
    match admin_only.render(&session, &"/users".into(), || "user table") {
        GuardView::Denied(d) => assert_eq!(d.role_label, "Security Analyst"),
        other => panic!("expected access denied, got {other:?}"),
    }
    let analyst_area = RouteGuard::new(Role::SecurityAnalyst.into());
    assert_eq!(analyst_area.render(&session, &"/logs".into(), || "log table").content(), Some("log table"));
    Ok(())
}

#[tokio::test]
async fn deep_link_survives_the_login_detour() -> anyhow::Result<()> {
    let store = fresh_store().await;
    let router = Router::new();
    let wanted = Location::new("/alerts?severity=critical");

    let from = match router.navigate(&wanted, &store.snapshot()) {
        Navigation::Redirect { to, from: Some(from) } => {
            assert_eq!(to.path, LOGIN_PATH);
            from
        }
        other => panic!("expected login redirect, got {other:?}"),
    };
    store.login("operator", "op123").await?;
    let target = post_login_target(Some(&from));
    assert_eq!(target, wanted);
    assert_eq!(
        router.navigate(&target, &store.snapshot()),
        Navigation::Show { page: Page::Alerts, location: wanted.clone() }
    );

    store.logout();
    assert!(matches!(router.navigate(&target, &store.snapshot()), Navigation::Redirect { .. }));
    Ok(())
}

#[tokio::test]
async fn loading_session_decides_nothing() {
    let store = SessionStore::new(
        Arc::new(MemoryStorage::new()),
        Authenticator::default().with_latency(Duration::ZERO),
        &ConsoleConfig::default(),
    );
    assert_eq!(Router::new().navigate(&"/users".into(), &store.snapshot()), Navigation::Loading);
    store.initialize().await;
    assert!(matches!(Router::new().navigate(&"/users".into(), &store.snapshot()), Navigation::Redirect { .. }));
}

#[tokio::test]
async fn menu_follows_the_role() -> anyhow::Result<()> {
    let store = fresh_store().await;
    store.login("admin", "admin123").await?;
    assert!(Router::new().menu(&store.snapshot()).contains(&Page::Users));
    store.logout();
    store.login("secadmin", "sec123").await?;
    let menu = Router::new().menu(&store.snapshot());
    assert!(!menu.contains(&Page::Users));
    assert!(menu.contains(&Page::Ports));
    Ok(())
}
