//! Session store: the single writer of the current authenticated identity.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route guards, the unread-count hook and page code read the session through
//! [`SessionHandle`]s and react to change notifications. Only the
//! [`SessionStore`] mutates it, and only in response to identity-provider
//! events.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Opaque identity object handed out by the identity provider. Only `id` is
/// interpreted by this crate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "user_metadata")]
    pub metadata: serde_json::Value,
}

/// Current authenticated identity and its loading status.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub user: Option<UserIdentity>,
    pub loading: bool,
}

impl Session {
    /// Session before the identity provider has answered.
    #[must_use]
    pub fn loading() -> Self {
        Self { user: None, loading: true }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self { user: None, loading: false }
    }

    #[must_use]
    pub fn signed_in(user: UserIdentity) -> Self {
        Self { user: Some(user), loading: false }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::loading()
    }
}

/// Identity-provider notifications the store reacts to.
#[derive(Clone, Debug, PartialEq)]
pub enum AuthEvent {
    /// Answer to the first "who is signed in" query.
    InitialSession(Option<UserIdentity>),
    SignedIn(UserIdentity),
    TokenRefreshed(UserIdentity),
    UserUpdated(UserIdentity),
    SignedOut,
    TokenExpired,
}

impl AuthEvent {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitialSession(_) => "initial_session",
            Self::SignedIn(_) => "signed_in",
            Self::TokenRefreshed(_) => "token_refreshed",
            Self::UserUpdated(_) => "user_updated",
            Self::SignedOut => "signed_out",
            Self::TokenExpired => "token_expired",
        }
    }

    /// The session this event leaves behind, whatever came before.
    #[must_use]
    pub fn resulting_session(&self) -> Session {
        match self {
            Self::InitialSession(user) => Session { user: user.clone(), loading: false },
            Self::SignedIn(user) | Self::TokenRefreshed(user) | Self::UserUpdated(user) => {
                Session::signed_in(user.clone())
            }
            Self::SignedOut | Self::TokenExpired => Session::signed_out(),
        }
    }
}

/// Sole owner and writer of the session. Not `Clone`: hand out handles.
#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<Session>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::loading());
        Self { tx }
    }

    /// A reader that observes every subsequent change.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle { rx: self.tx.subscribe() }
    }

    #[must_use]
    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    /// Apply an identity-provider event. Returns `true` if the session changed.
    pub fn apply(&self, event: AuthEvent) -> bool {
        let next = event.resulting_session();
        let changed = self.tx.send_if_modified(|session| {
            if *session == next {
                false
            } else {
                *session = next;
                true
            }
        });
        tracing::debug!(event = event.kind(), changed, "session event applied");
        changed
    }

    /// Return to the loading state, e.g. while a sign-in request is in flight.
    pub fn mark_loading(&self) {
        self.tx.send_if_modified(|session| {
            if session.loading {
                false
            } else {
                session.loading = true;
                true
            }
        });
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the session with change notification.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    rx: watch::Receiver<Session>,
}

impl SessionHandle {
    #[must_use]
    pub fn current(&self) -> Session {
        self.rx.borrow().clone()
    }

    /// Current value, marking it as seen so `changed` waits for the next one.
    pub fn current_and_mark_seen(&mut self) -> Session {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next change. Returns `false` once the store is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Forward identity-provider events into the store until the provider's
/// event stream closes.
#[cfg(feature = "native")]
pub async fn run_identity_sync<P>(store: &SessionStore, provider: &P)
where
    P: crate::backend::IdentityProvider + ?Sized,
{
    use tokio::sync::broadcast::error::RecvError;

    // Subscribe before the initial query so a sign-in racing it is not lost.
    let mut events = provider.subscribe();

    match provider.current_user().await {
        Ok(user) => {
            store.apply(AuthEvent::InitialSession(user));
        }
        Err(e) => {
            tracing::warn!(error = %e, "initial session lookup failed; treating as signed out");
            store.apply(AuthEvent::InitialSession(None));
        }
    }

    loop {
        match events.recv().await {
            Ok(event) => {
                store.apply(event);
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "auth events lagged; re-reading current user");
                let user = provider.current_user().await.ok().flatten();
                store.apply(AuthEvent::InitialSession(user));
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::debug!("identity sync stopped");
}
