//! User-facing route guard.
//!
//! SYSTEM CONTEXT
//! ==============
//! Wraps a protected view. While the session is loading the guard renders a
//! placeholder and never navigates. Once loaded, a missing user records the
//! current location as the post-login redirect target and replaces history
//! with the login view; a present user renders the wrapped view unchanged.

#[cfg(test)]
#[path = "route_test.rs"]
mod route_test;

use crate::nav::{Location, NavigateOptions, Navigator};
use crate::session::{Session, SessionHandle};
use crate::store::{KeyValueStore, REDIRECT_TARGET_KEY};

pub const LOGIN_PATH: &str = "/login";

/// Pure decision for one session snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Loading,
    Render,
    RedirectToLogin,
}

#[must_use]
pub fn decide(session: &Session) -> GuardDecision {
    if session.loading {
        GuardDecision::Loading
    } else if session.user.is_some() {
        GuardDecision::Render
    } else {
        GuardDecision::RedirectToLogin
    }
}

/// What the guard renders in place of the wrapped view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Guarded<V> {
    Loading,
    Content(V),
    /// Navigation to the login view has been issued; render nothing.
    Redirecting,
}

impl<V> Guarded<V> {
    #[must_use]
    pub fn content(self) -> Option<V> {
        match self {
            Self::Content(v) => Some(v),
            Self::Loading | Self::Redirecting => None,
        }
    }
}

/// One guard instance per mounted protected view.
pub struct RouteGuard<N, S> {
    navigator: N,
    redirect_store: S,
    login_path: String,
    redirected: bool,
}

impl<N: Navigator, S: KeyValueStore> RouteGuard<N, S> {
    /// `redirect_store` is the session-scoped store that receives the
    /// post-login redirect target.
    pub fn new(navigator: N, redirect_store: S) -> Self {
        Self { navigator, redirect_store, login_path: LOGIN_PATH.to_owned(), redirected: false }
    }

    #[must_use]
    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    /// Whether a login redirect has been issued and not yet cleared by a
    /// signed-in session.
    #[must_use]
    pub fn has_redirected(&self) -> bool {
        self.redirected
    }

    /// Evaluate one session snapshot. Navigates at most once per transition
    /// into the signed-out state, however many notifications repeat it.
    pub fn evaluate<V>(&mut self, session: &Session, location: &Location, view: impl FnOnce() -> V) -> Guarded<V> {
        match decide(session) {
            GuardDecision::Loading => Guarded::Loading,
            GuardDecision::Render => {
                self.redirected = false;
                Guarded::Content(view())
            }
            GuardDecision::RedirectToLogin => {
                if !self.redirected {
                    self.redirect_to_login(location);
                    self.redirected = true;
                }
                Guarded::Redirecting
            }
        }
    }

    fn redirect_to_login(&self, location: &Location) {
        let target = location.href();
        if location.path != self.login_path {
            self.redirect_store.set(REDIRECT_TARGET_KEY, &target);
        }
        tracing::info!(from = %target, to = %self.login_path, "no session; redirecting to login");
        self.navigator.navigate(&self.login_path, NavigateOptions::replace());
    }

    /// Re-evaluate on every session change until the session store goes away
    /// or the future is dropped (teardown). Each evaluation is handed to
    /// `render`.
    pub async fn watch<V, F, R>(&mut self, mut session: SessionHandle, location: Location, mut view: F, mut render: R)
    where
        F: FnMut() -> V,
        R: FnMut(Guarded<V>),
    {
        loop {
            let current = session.current_and_mark_seen();
            render(self.evaluate(&current, &location, &mut view));
            if !session.changed().await {
                break;
            }
        }
    }
}

/// Consume the post-login redirect target. Only same-origin absolute paths
/// are honoured; anything else is discarded.
pub fn take_redirect_target(store: &impl KeyValueStore) -> Option<String> {
    let target = store.get(REDIRECT_TARGET_KEY)?;
    store.remove(REDIRECT_TARGET_KEY);
    if is_local_path(&target) {
        Some(target)
    } else {
        tracing::warn!(%target, "discarding non-local redirect target");
        None
    }
}

fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}
