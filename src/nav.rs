//! Navigation seam and an in-memory history implementation.
//!
//! SYSTEM CONTEXT
//! ==============
//! Guards and the canonical redirect resolver never touch the router
//! directly; they call a [`Navigator`]. The Leptos client adapts
//! `use_navigate`, the CLI and tests use [`MemoryHistory`].

#[cfg(test)]
#[path = "nav_test.rs"]
mod nav_test;

use std::sync::{Arc, Mutex};

/// Options accompanying a navigation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
}

impl NavigateOptions {
    #[must_use]
    pub fn replace() -> Self {
        Self { replace: true }
    }
}

pub trait Navigator {
    fn navigate(&self, to: &str, options: NavigateOptions);
}

impl<T: Navigator + ?Sized> Navigator for Arc<T> {
    fn navigate(&self, to: &str, options: NavigateOptions) {
        (**self).navigate(to, options);
    }
}

/// Adapter turning any navigation closure into a [`Navigator`].
pub struct FnNavigator<F>(pub F);

impl<F> Navigator for FnNavigator<F>
where
    F: Fn(&str, NavigateOptions),
{
    fn navigate(&self, to: &str, options: NavigateOptions) {
        (self.0)(to, options);
    }
}

/// Path + query of the current view, e.g. `/profile/42` + `?ref=x`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    /// Query string including the leading `?`, or empty.
    pub query: String,
}

impl Location {
    #[must_use]
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        let query = query.into();
        let query = if query.is_empty() || query.starts_with('?') { query } else { format!("?{query}") };
        Self { path: path.into(), query }
    }

    /// Split `"/a/b?x=1#frag"` into path and query. Fragments are dropped.
    #[must_use]
    pub fn parse(href: &str) -> Self {
        let without_fragment = href.split('#').next().unwrap_or_default();
        match without_fragment.split_once('?') {
            Some((path, query)) if !query.is_empty() => Self::new(path, format!("?{query}")),
            Some((path, _)) => Self::new(path, ""),
            None => Self::new(without_fragment, ""),
        }
    }

    /// Path followed by query, as recorded for post-login return.
    #[must_use]
    pub fn href(&self) -> String {
        format!("{}{}", self.path, self.query)
    }
}

/// A single navigation as observed by [`MemoryHistory`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationRecord {
    pub to: String,
    pub replace: bool,
}

/// In-memory history stack. Records every navigation call.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    inner: Mutex<HistoryInner>,
}

#[derive(Debug, Default)]
struct HistoryInner {
    entries: Vec<String>,
    calls: Vec<NavigationRecord>,
}

impl MemoryHistory {
    #[must_use]
    pub fn starting_at(href: &str) -> Self {
        let history = Self::default();
        if let Ok(mut inner) = history.inner.lock() {
            inner.entries.push(href.to_owned());
        }
        history
    }

    /// Every navigation call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<NavigationRecord> {
        self.inner.lock().map(|i| i.calls.clone()).unwrap_or_default()
    }

    /// History entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.inner.lock().map(|i| i.entries.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.inner.lock().ok()?.entries.last().cloned()
    }
}

impl Navigator for MemoryHistory {
    fn navigate(&self, to: &str, options: NavigateOptions) {
        tracing::debug!(to, replace = options.replace, "navigate");
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if options.replace {
            inner.entries.pop();
        }
        inner.entries.push(to.to_owned());
        inner.calls.push(NavigationRecord { to: to.to_owned(), replace: options.replace });
    }
}
