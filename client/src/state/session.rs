//! Session context for the browser.
//!
//! SYSTEM CONTEXT
//! ==============
//! `App` provides one `RwSignal<Session>`; route guards and pages read it with
//! `expect_context`. Only the functions here write it, and only in response
//! to identity events, mirroring the core `SessionStore`.
//!
//! The access token is kept in local storage under [`ACCESS_TOKEN_KEY`] so a
//! reload can restore the session with one `/auth/v1/user` call.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use encore::session::{AuthEvent, Session};
use leptos::prelude::*;

pub const ACCESS_TOKEN_KEY: &str = "encore.accessToken";

/// Create the session signal in the loading state and provide it as context.
pub fn provide_session() -> RwSignal<Session> {
    let session = RwSignal::new(Session::loading());
    provide_context(session);
    session
}

/// The session after `event`, or `None` if `current` already matches it.
pub fn next_session(current: &Session, event: &AuthEvent) -> Option<Session> {
    let next = event.resulting_session();
    (*current != next).then_some(next)
}

/// Apply an identity event. Returns `true` if the session changed; watchers
/// are only notified in that case.
pub fn apply_event(session: RwSignal<Session>, event: &AuthEvent) -> bool {
    let changed = session
        .try_maybe_update(|current| match next_session(current, event) {
            Some(next) => {
                *current = next;
                (true, true)
            }
            None => (false, false),
        })
        .unwrap_or(false);
    tracing::debug!(event = event.kind(), changed, "session event applied");
    changed
}

/// Answer the initial "who is signed in" question from the stored token.
/// Without a token, or when the token is rejected, the session settles as
/// signed out.
pub fn restore_session(session: RwSignal<Session>) {
    #[cfg(feature = "hydrate")]
    leptos::task::spawn_local(async move {
        use encore::store::KeyValueStore;

        let store = crate::util::storage::BrowserStore::local();
        let user = match store.get(ACCESS_TOKEN_KEY) {
            Some(token) => crate::net::api::fetch_current_user(&token).await,
            None => None,
        };
        if user.is_none() {
            store.remove(ACCESS_TOKEN_KEY);
        }
        apply_event(session, &AuthEvent::InitialSession(user));
    });
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = session;
    }
}

/// Forget the stored token and sign out locally; the remote logout is best
/// effort.
pub fn sign_out(session: RwSignal<Session>) {
    #[cfg(feature = "hydrate")]
    {
        use encore::store::KeyValueStore;

        let store = crate::util::storage::BrowserStore::local();
        if let Some(token) = store.get(ACCESS_TOKEN_KEY) {
            leptos::task::spawn_local(async move { crate::net::api::logout(&token).await });
        }
        store.remove(ACCESS_TOKEN_KEY);
    }
    apply_event(session, &AuthEvent::SignedOut);
}
