use crate::session::*;
use crate::storage::*;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};

fn jwt_expiring_at(exp: i64) -> String {
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({ "sub": "user-1", "exp": exp }).to_string());
    format!("e30.{}.sig", payload)
}

fn new_session() -> (AuthSession<MemoryStore>, SafeStore<MemoryStore>) {
    let store = SafeStore::new(MemoryStore::new());
    (AuthSession::new(store.clone()), store)
}

#[tokio::test]
async fn test_new_session_is_loading() {
    let (session, _store) = new_session();

    assert_eq!(session.snapshot(), AuthSnapshot::loading());
    assert_eq!(*session.subscribe().borrow(), AuthSnapshot::loading());
    assert_eq!(session.profile().await, None);
}

#[tokio::test]
async fn test_restore_without_token_is_signed_out() {
    let (session, _store) = new_session();

    assert_eq!(session.restore().await, AuthSnapshot::resolved(false));
    assert_eq!(session.snapshot(), AuthSnapshot::resolved(false));
}

#[tokio::test]
async fn test_sign_in_persists_session() {
    let (session, store) = new_session();
    let profile = SessionProfile::new("user-1", "picker@example.com");

    assert!(session.sign_in("opaque-token", profile.clone()).await);
    assert_eq!(session.snapshot(), AuthSnapshot::resolved(true));
    assert_eq!(session.profile().await, Some(profile.clone()));
    assert_eq!(
        store.inner().get("identity:token").await.unwrap().as_deref(),
        Some("opaque-token")
    );

    // A fresh session over the same store restores it
    let restored = AuthSession::new(store.clone());
    assert_eq!(restored.restore().await, AuthSnapshot::resolved(true));
    assert_eq!(restored.profile().await, Some(profile));
}

#[tokio::test]
async fn test_restore_discards_expired_token() {
    let (session, store) = new_session();
    let expired = jwt_expiring_at((Utc::now() - Duration::hours(1)).timestamp());
    assert!(session.sign_in(&expired, SessionProfile::new("user-1", "picker@example.com")).await);

    let restored = AuthSession::new(store.clone());
    assert_eq!(restored.restore().await, AuthSnapshot::resolved(false));
    assert_eq!(restored.profile().await, None);
    assert!(store.inner().is_empty().await);
}

#[tokio::test]
async fn test_restore_keeps_unexpired_token() {
    let (session, store) = new_session();
    let valid = jwt_expiring_at((Utc::now() + Duration::hours(1)).timestamp());
    assert!(session.sign_in(&valid, SessionProfile::new("user-1", "picker@example.com")).await);

    let restored = AuthSession::new(store);
    assert_eq!(restored.restore().await, AuthSnapshot::resolved(true));
}

#[test]
fn test_token_expiry_parsing() {
    let exp = (Utc::now() + Duration::days(1)).timestamp();
    assert_eq!(token_expiry(&jwt_expiring_at(exp)).map(|t| t.timestamp()), Some(exp));

    assert_eq!(token_expiry("opaque-token"), None);
    assert_eq!(token_expiry("a.b"), None);
    assert_eq!(token_expiry("a.b.c.d"), None);
    assert_eq!(token_expiry("e30.!!!.sig"), None);

    let no_exp = URL_SAFE_NO_PAD.encode(r#"{"sub":"user-1"}"#);
    assert_eq!(token_expiry(&format!("e30.{}.sig", no_exp)), None);
}

#[tokio::test]
async fn test_corrupted_token_restores_signed_out() {
    let (session, store) = new_session();
    store.inner().set("identity:token", "undefined").await.unwrap();

    assert_eq!(session.restore().await, AuthSnapshot::resolved(false));
    assert_eq!(store.inner().get("identity:token").await.unwrap(), None);
}

#[tokio::test]
async fn test_corrupted_profile_keeps_session() {
    let (session, store) = new_session();
    store.inner().set("identity:token", "opaque-token").await.unwrap();
    store.inner().set(PROFILE_KEY, "[object Object]").await.unwrap();

    assert_eq!(session.restore().await, AuthSnapshot::resolved(true));
    assert_eq!(session.profile().await, None);
    assert_eq!(store.inner().get(PROFILE_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_sign_in_with_unstorable_token_publishes_nothing() {
    let (session, store) = new_session();
    session.restore().await;
    let mut rx = session.subscribe();
    rx.borrow_and_update();

    assert!(!session.sign_in("undefined", SessionProfile::new("user-1", "picker@example.com")).await);
    assert!(!rx.has_changed().unwrap());
    assert_eq!(session.snapshot(), AuthSnapshot::resolved(false));
    assert!(store.inner().is_empty().await);
}

#[tokio::test]
async fn test_sign_out_clears_and_publishes() {
    let (session, store) = new_session();
    assert!(session.sign_in("opaque-token", SessionProfile::new("user-1", "picker@example.com")).await);

    let mut rx = session.subscribe();
    rx.borrow_and_update();

    session.sign_out().await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), AuthSnapshot::resolved(false));
    assert_eq!(session.profile().await, None);
    assert!(store.inner().is_empty().await);
}

#[test]
fn test_token_key_follows_identity_namespace() {
    let store = SafeStore::new(MemoryStore::new()).with_identity_namespace("user");
    assert_eq!(store.identity_key(TOKEN_NAME), "user:token");
}
