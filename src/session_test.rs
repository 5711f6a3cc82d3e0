use super::*;
use crate::test_helpers::user;
use tokio::time::{Duration, timeout};

#[test]
fn new_store_starts_loading_without_user() {
    let store = SessionStore::new();
    let session = store.current();
    assert!(session.loading);
    assert!(session.user.is_none());
}

#[test]
fn initial_session_clears_loading() {
    let store = SessionStore::new();
    assert!(store.apply(AuthEvent::InitialSession(Some(user("u-1")))));
    let session = store.current();
    assert!(!session.loading);
    assert_eq!(session.user_id(), Some("u-1"));
}

#[test]
fn sign_out_and_expiry_reset_identity() {
    let store = SessionStore::new();
    store.apply(AuthEvent::SignedIn(user("u-1")));
    assert!(store.apply(AuthEvent::TokenExpired));
    assert_eq!(store.current(), Session::signed_out());

    store.apply(AuthEvent::SignedIn(user("u-1")));
    assert!(store.apply(AuthEvent::SignedOut));
    assert_eq!(store.current(), Session::signed_out());
}

#[test]
fn identical_event_reports_no_change() {
    let store = SessionStore::new();
    assert!(store.apply(AuthEvent::SignedIn(user("u-1"))));
    assert!(!store.apply(AuthEvent::TokenRefreshed(user("u-1"))));
}

#[test]
fn mark_loading_keeps_user() {
    let store = SessionStore::new();
    store.apply(AuthEvent::SignedIn(user("u-1")));
    store.mark_loading();
    let session = store.current();
    assert!(session.loading);
    assert_eq!(session.user_id(), Some("u-1"));
}

#[tokio::test]
async fn handles_are_notified_of_changes() {
    let store = SessionStore::new();
    let mut handle = store.handle();
    let _ = handle.current_and_mark_seen();

    store.apply(AuthEvent::SignedIn(user("u-7")));
    let changed = timeout(Duration::from_millis(200), handle.changed()).await.expect("change notification");
    assert!(changed);
    assert_eq!(handle.current().user_id(), Some("u-7"));
}

#[tokio::test]
async fn handle_reports_closed_store() {
    let store = SessionStore::new();
    let mut handle = store.handle();
    let _ = handle.current_and_mark_seen();
    drop(store);
    assert!(!handle.changed().await);
}

#[test]
fn user_identity_reads_provider_payload() {
    let raw = serde_json::json!({
        "id": "9b1c",
        "email": "amy@example.com",
        "user_metadata": {"username": "dj_amy"},
        "aud": "authenticated"
    });
    let identity: UserIdentity = serde_json::from_value(raw).expect("identity");
    assert_eq!(identity.id, "9b1c");
    assert_eq!(identity.email.as_deref(), Some("amy@example.com"));
    assert_eq!(identity.metadata["username"], "dj_amy");
}

#[cfg(feature = "native")]
mod identity_sync {
    use super::*;
    use crate::error::BackendError;
    use crate::test_helpers::MockIdentity;

    #[tokio::test]
    async fn initial_lookup_then_provider_events() {
        let provider = MockIdentity::new(Ok(Some(user("u-1"))));
        let store = SessionStore::new();
        let mut handle = store.handle();

        let driver = async {
            timeout(Duration::from_millis(500), handle.changed()).await.expect("initial session");
            assert_eq!(handle.current_and_mark_seen(), Session::signed_in(user("u-1")));

            provider.emit(AuthEvent::SignedOut);
            timeout(Duration::from_millis(500), handle.changed()).await.expect("sign-out");
            assert_eq!(handle.current_and_mark_seen(), Session::signed_out());
        };
        tokio::select! {
            () = run_identity_sync(&store, &provider) => panic!("provider stream should stay open"),
            () = driver => {}
        }
    }

    #[tokio::test]
    async fn failed_initial_lookup_counts_as_signed_out() {
        let provider = MockIdentity::new(Err(BackendError::Request("offline".into())));
        let store = SessionStore::new();
        let mut handle = store.handle();

        tokio::select! {
            () = run_identity_sync(&store, &provider) => panic!("provider stream should stay open"),
            changed = timeout(Duration::from_millis(500), handle.changed()) => {
                assert!(changed.expect("initial session"));
            }
        }
        assert_eq!(store.current(), Session::signed_out());
    }
}

#[test]
fn resulting_session_ignores_prior_state() {
    assert_eq!(AuthEvent::InitialSession(None).resulting_session(), Session::signed_out());
    assert_eq!(AuthEvent::UserUpdated(user("u-2")).resulting_session(), Session::signed_in(user("u-2")));
}
