//! Canonical profile redirect: `/profile/{id}` to `/{m|l}/{username}`.
//!
//! SYSTEM CONTEXT
//! ==============
//! Old links address profiles by user id. The canonical URL uses the username
//! under a prefix chosen by the profile's user type (`m` for musicians, `l`
//! for listeners). The lookup is asynchronous, so the resolver is split in
//! two: [`CanonicalRedirect::begin`] decides synchronously whether a lookup
//! is needed and hands out a [`PendingLookup`]; whoever performs the lookup
//! (the native table client or the browser's fetch) feeds the outcome to
//! [`PendingLookup::complete`], which navigates only if its epoch is still
//! current.

#[cfg(test)]
#[path = "redirect_test.rs"]
mod redirect_test;

use std::fmt::Display;
use std::sync::Arc;

use crate::data::ProfileSummary;
use crate::epoch::{Epoch, EpochToken};
use crate::nav::{Location, NavigateOptions, Navigator};

pub const LEGACY_PROFILE_PREFIX: &str = "/profile/";
pub const MUSICIAN_USER_TYPE: &str = "musician";

/// The user id in a legacy profile path: exactly one non-empty segment
/// after `/profile/`.
#[must_use]
pub fn legacy_user_id(path: &str) -> Option<&str> {
    let id = path.strip_prefix(LEGACY_PROFILE_PREFIX)?;
    (!id.is_empty() && !id.contains('/')).then_some(id)
}

#[must_use]
pub fn prefix_for(user_type: Option<&str>) -> &'static str {
    if user_type == Some(MUSICIAN_USER_TYPE) { "m" } else { "l" }
}

/// `/{prefix}/{username}{query}`, or `None` when the profile has no username.
#[must_use]
pub fn canonical_path(summary: &ProfileSummary, query: &str) -> Option<String> {
    let username = summary.username.as_deref().filter(|u| !u.trim().is_empty())?;
    Some(format!("/{}/{username}{query}", prefix_for(summary.user_type.as_deref())))
}

/// Identity of a navigator for deduplication: the address of its shared
/// allocation.
#[must_use]
pub fn navigator_identity<T: ?Sized>(navigator: &Arc<T>) -> usize {
    Arc::as_ptr(navigator).cast::<()>().addr()
}

/// Everything a resolution depends on. An unchanged key never triggers a
/// second lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectKey {
    pub user_id: String,
    pub path: String,
    pub query: String,
    pub navigator: usize,
}

/// A lookup the caller must perform, tied to the activation that issued it.
#[derive(Debug)]
pub struct PendingLookup {
    pub user_id: String,
    query: String,
    token: EpochToken,
}

impl PendingLookup {
    /// Apply the lookup outcome. Navigates (replacing history) and returns the
    /// target when the profile has a username and this lookup is still the
    /// resolver's current activation; otherwise does nothing.
    pub fn complete<N, E>(self, outcome: Result<Option<ProfileSummary>, E>, navigator: &N) -> Option<String>
    where
        N: Navigator + ?Sized,
        E: Display,
    {
        if !self.token.is_current() {
            tracing::debug!(user_id = %self.user_id, "discarding superseded profile lookup");
            return None;
        }
        let summary = match outcome {
            Ok(Some(summary)) => summary,
            Ok(None) => {
                tracing::debug!(user_id = %self.user_id, "legacy profile has no row; staying put");
                return None;
            }
            Err(e) => {
                tracing::warn!(user_id = %self.user_id, error = %e, "legacy profile lookup failed");
                return None;
            }
        };
        let Some(target) = canonical_path(&summary, &self.query) else {
            tracing::debug!(user_id = %self.user_id, "legacy profile has no username; staying put");
            return None;
        };
        tracing::info!(user_id = %self.user_id, to = %target, "redirecting legacy profile url");
        navigator.navigate(&target, NavigateOptions::replace());
        Some(target)
    }
}

/// One resolver per mounted legacy profile route.
#[derive(Debug, Default)]
pub struct CanonicalRedirect {
    epoch: Epoch,
    last_key: Option<RedirectKey>,
}

impl CanonicalRedirect {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a resolution for route parameter `id` at `location`.
    ///
    /// Returns `None` when the path is not a legacy profile path, the id is
    /// empty, or nothing in the key changed since the last call. A new key
    /// supersedes any lookup still in flight.
    pub fn begin(&mut self, id: &str, location: &Location, navigator: usize) -> Option<PendingLookup> {
        legacy_user_id(&location.path)?;
        if id.is_empty() {
            return None;
        }
        let key = RedirectKey {
            user_id: id.to_owned(),
            path: location.path.clone(),
            query: location.query.clone(),
            navigator,
        };
        if self.last_key.as_ref() == Some(&key) {
            return None;
        }
        let token = self.epoch.advance();
        tracing::debug!(user_id = id, generation = token.generation(), "resolving legacy profile");
        self.last_key = Some(key);
        Some(PendingLookup { user_id: id.to_owned(), query: location.query.clone(), token })
    }

    /// Discard every outstanding lookup. A later `begin` starts afresh.
    pub fn teardown(&mut self) {
        self.epoch.advance();
        self.last_key = None;
    }
}

/// Run the profile lookup for `pending` through the table client and apply
/// the outcome.
#[cfg(feature = "native")]
pub async fn resolve<C, N>(pending: PendingLookup, client: &C, navigator: &N) -> Option<String>
where
    C: crate::backend::TableClient + ?Sized,
    N: Navigator + ?Sized,
{
    let outcome = crate::data::profiles::fetch_profile_summary(client, &pending.user_id).await;
    pending.complete(outcome, navigator)
}
