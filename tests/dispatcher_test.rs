//! QueryDispatcher login and submission against a scripted workspace

mod common;

use common::{FakeSurface, pages_of, test_config, test_config_builder};
use std::time::Duration;
use tempfile::TempDir;

use slack_search_export::auth::{AuthSession, AuthSessionStore, StoredCookie};
use slack_search_export::error::HarvestError;
use slack_search_export::export::ExportFormat;
use slack_search_export::interrupt::CancelFlag;
use slack_search_export::workspace_search::{LoginMode, QueryDispatcher};

fn stored_session() -> AuthSession {
    AuthSession::new(
        vec![StoredCookie {
            name: "d".to_string(),
            value: "xoxd-stored".to_string(),
            domain: ".slack.com".to_string(),
            path: "/".to_string(),
            expires: None,
            http_only: true,
            secure: true,
            same_site: None,
        }],
        Vec::new(),
    )
}

#[tokio::test]
async fn test_stored_session_is_reused_without_login() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Text);
    let store = AuthSessionStore::new(config.auth_file());
    store.save(&stored_session()).await.unwrap();
    let surface = FakeSurface::new(pages_of(&[1])).with_human_login_after(None);

    let outcome = QueryDispatcher::new(&surface, &store, &config, CancelFlag::new())
        .dispatch(&config.search_request(), LoginMode::ReuseSession)
        .await
        .unwrap();

    assert!(!outcome.interactive_login);
    assert_eq!(surface.captures(), 0);
    assert_eq!(surface.typed_queries(), vec![config.query().to_string()]);
}

#[tokio::test]
async fn test_first_login_is_interactive_and_saved() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Text);
    let store = AuthSessionStore::new(config.auth_file());
    let surface = FakeSurface::new(pages_of(&[1]));

    let outcome = QueryDispatcher::new(&surface, &store, &config, CancelFlag::new())
        .dispatch(&config.search_request(), LoginMode::ReuseSession)
        .await
        .unwrap();

    assert!(outcome.interactive_login);
    assert_eq!(surface.logins(), 1);
    let saved = store.load().await.unwrap().unwrap();
    assert_eq!(saved.cookies[0].value, "xoxd-1");
}

#[tokio::test]
async fn test_rejected_session_is_invalidated_and_replaced() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Text);
    let store = AuthSessionStore::new(config.auth_file());
    store.save(&stored_session()).await.unwrap();
    // The human needs longer than the signed-in probe lasts
    let surface = FakeSurface::new(pages_of(&[1]))
        .rejecting_sessions()
        .with_human_login_after(Some(50));

    let outcome = QueryDispatcher::new(&surface, &store, &config, CancelFlag::new())
        .dispatch(&config.search_request(), LoginMode::ReuseSession)
        .await
        .unwrap();

    assert!(outcome.interactive_login);
    let saved = store.load().await.unwrap().unwrap();
    assert_eq!(saved.cookies[0].value, "xoxd-1");
}

#[tokio::test]
async fn test_login_not_completed_times_out() {
    let dir = TempDir::new().unwrap();
    let config = test_config_builder(dir.path(), ExportFormat::Text)
        .login_timeout(Duration::from_millis(30))
        .build()
        .unwrap();
    let store = AuthSessionStore::new(config.auth_file());
    let surface = FakeSurface::new(pages_of(&[1])).with_human_login_after(None);

    let err = QueryDispatcher::new(&surface, &store, &config, CancelFlag::new())
        .dispatch(&config.search_request(), LoginMode::ReuseSession)
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::AuthTimeout { .. }), "{err:?}");
    assert!(err.is_fatal());
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancel_during_login_wait() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Text);
    let store = AuthSessionStore::new(config.auth_file());
    let surface = FakeSurface::new(pages_of(&[1])).with_human_login_after(None);
    let cancel = CancelFlag::new();
    cancel.cancel();

    let err = QueryDispatcher::new(&surface, &store, &config, cancel)
        .dispatch(&config.search_request(), LoginMode::ReuseSession)
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::Cancelled));
}

#[tokio::test]
async fn test_unreachable_workspace_is_navigation_error() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Text);
    let store = AuthSessionStore::new(config.auth_file());
    let surface = FakeSurface::new(pages_of(&[1])).unreachable();

    let err = QueryDispatcher::new(&surface, &store, &config, CancelFlag::new())
        .dispatch(&config.search_request(), LoginMode::ReuseSession)
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::Navigation(_)), "{err:?}");
}

#[tokio::test]
async fn test_forced_login_ignores_stored_session() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Text);
    let store = AuthSessionStore::new(config.auth_file());
    store.save(&stored_session()).await.unwrap();
    let surface = FakeSurface::new(pages_of(&[1]));

    let outcome = QueryDispatcher::new(&surface, &store, &config, CancelFlag::new())
        .dispatch(&config.search_request(), LoginMode::ForceInteractive)
        .await
        .unwrap();

    assert!(outcome.interactive_login);
    assert_eq!(surface.logins(), 1);
}

#[tokio::test]
async fn test_effective_query_and_reported_total_are_surfaced() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Text);
    let store = AuthSessionStore::new(config.auth_file());
    let surface = FakeSurface::new(pages_of(&[1]))
        .with_effective_query("from:@alice.smith after:2024-01-01")
        .with_result_count("1,234 results");

    let outcome = QueryDispatcher::new(&surface, &store, &config, CancelFlag::new())
        .dispatch(&config.search_request(), LoginMode::ReuseSession)
        .await
        .unwrap();

    assert_eq!(
        outcome.effective_query.as_deref(),
        Some("from:@alice.smith after:2024-01-01")
    );
    assert_eq!(outcome.reported_total, Some(1234));
}
