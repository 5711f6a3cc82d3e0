//! Admin route guard.
//!
//! SYSTEM CONTEXT
//! ==============
//! Admin views are gated on a flag the admin login page writes to durable
//! browser storage. The check is synchronous and local: it never waits on the
//! network and nothing on the server validates the flag.
//!
//! KNOWN WEAKNESS
//! ==============
//! Anyone able to edit browser storage can write `{"isAdmin":true}` and pass
//! this guard. Admin data must still be protected by the backend's row-level
//! policies; this guard only decides what the client renders.

#[cfg(test)]
#[path = "admin_test.rs"]
mod admin_test;

use serde::{Deserialize, Serialize};

use super::route::Guarded;
use crate::nav::{NavigateOptions, Navigator};
use crate::store::{ADMIN_SESSION_KEY, KeyValueStore};

pub const ADMIN_LOGIN_PATH: &str = "/admin/login";

/// Locally persisted admin flag, stored as `{"isAdmin":true}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

/// Result of reading the stored flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoredAdminSession {
    Missing,
    Malformed(String),
    Present(AdminSession),
}

impl AdminSession {
    #[must_use]
    pub fn read(store: &impl KeyValueStore) -> StoredAdminSession {
        let Some(raw) = store.get(ADMIN_SESSION_KEY) else {
            return StoredAdminSession::Missing;
        };
        match serde_json::from_str::<AdminSession>(&raw) {
            Ok(session) => StoredAdminSession::Present(session),
            Err(e) => StoredAdminSession::Malformed(e.to_string()),
        }
    }

    /// Persist the flag. Called by the admin login page after it accepts the
    /// credentials.
    pub fn store(&self, store: &impl KeyValueStore) {
        match serde_json::to_string(self) {
            Ok(raw) => store.set(ADMIN_SESSION_KEY, &raw),
            Err(e) => tracing::error!(error = %e, "admin session encode failed"),
        }
    }

    pub fn clear(store: &impl KeyValueStore) {
        store.remove(ADMIN_SESSION_KEY);
    }
}

/// Lifecycle of one admin guard instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminDecision {
    /// Mounted, stored flag not yet read.
    Validating,
    Authorized,
    /// Flag missing, malformed or false; navigation to admin login issued.
    Redirected,
}

pub struct AdminGuard<N, S> {
    navigator: N,
    store: S,
    login_path: String,
    state: AdminDecision,
}

impl<N: Navigator, S: KeyValueStore> AdminGuard<N, S> {
    /// `store` is the durable store holding the admin flag.
    pub fn new(navigator: N, store: S) -> Self {
        Self { navigator, store, login_path: ADMIN_LOGIN_PATH.to_owned(), state: AdminDecision::Validating }
    }

    #[must_use]
    pub fn state(&self) -> AdminDecision {
        self.state
    }

    /// Read the stored flag and settle. Only the first call inspects storage;
    /// later calls return the settled decision so navigation happens at most
    /// once per mount.
    pub fn check(&mut self) -> AdminDecision {
        if self.state != AdminDecision::Validating {
            return self.state;
        }

        self.state = match AdminSession::read(&self.store) {
            StoredAdminSession::Present(AdminSession { is_admin: true }) => AdminDecision::Authorized,
            StoredAdminSession::Present(AdminSession { is_admin: false }) => {
                tracing::info!("admin flag is false; redirecting to admin login");
                self.reject()
            }
            StoredAdminSession::Missing => {
                tracing::info!("no admin session; redirecting to admin login");
                self.reject()
            }
            StoredAdminSession::Malformed(reason) => {
                tracing::error!(%reason, "stored admin session is malformed; clearing");
                self.reject()
            }
        };
        self.state
    }

    fn reject(&self) -> AdminDecision {
        AdminSession::clear(&self.store);
        self.navigator.navigate(&self.login_path, NavigateOptions::replace());
        AdminDecision::Redirected
    }

    /// Map the current state to what should be rendered. Does not settle the
    /// guard; call [`AdminGuard::check`] first.
    pub fn render<V>(&self, view: impl FnOnce() -> V) -> Guarded<V> {
        match self.state {
            AdminDecision::Validating => Guarded::Loading,
            AdminDecision::Authorized => Guarded::Content(view()),
            AdminDecision::Redirected => Guarded::Redirecting,
        }
    }
}
