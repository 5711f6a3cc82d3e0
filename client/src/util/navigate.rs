//! Router adapter for the core `Navigator` seam.

#[cfg(test)]
#[path = "navigate_test.rs"]
mod navigate_test;

use std::sync::Arc;

use encore::nav::{FnNavigator, NavigateOptions};
use leptos_router::hooks::use_navigate;

/// Map core navigation options onto the router's.
pub fn router_options(options: NavigateOptions) -> leptos_router::NavigateOptions {
    leptos_router::NavigateOptions { replace: options.replace, ..Default::default() }
}

/// A navigator bound to the enclosing router. Must be called inside a
/// component under `<Router>`.
pub fn router_navigator() -> Arc<FnNavigator<impl Fn(&str, NavigateOptions) + Clone + 'static>> {
    let navigate = use_navigate();
    Arc::new(FnNavigator(move |to: &str, options: NavigateOptions| navigate(to, router_options(options))))
}
