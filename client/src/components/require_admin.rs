//! Gate children on the locally stored admin flag.
//!
//! The flag is read from `localStorage` once per mount; anything other than
//! `{"isAdmin":true}` clears it and replaces the entry with `/admin/login`.
//! Nothing here talks to the server.

use encore::guard::{AdminDecision, AdminGuard};
use leptos::prelude::*;

use crate::util::navigate::router_navigator;
use crate::util::storage::BrowserStore;

#[component]
pub fn RequireAdmin(children: ChildrenFn) -> impl IntoView {
    let guard = StoredValue::new_local(AdminGuard::new(router_navigator(), BrowserStore::local()));
    let decision = RwSignal::new(AdminDecision::Validating);

    // Storage is only readable after hydration, so settle in an effect.
    Effect::new(move || {
        let settled = guard.try_update_value(AdminGuard::check).unwrap_or(AdminDecision::Redirected);
        decision.set(settled);
    });

    move || match decision.get() {
        AdminDecision::Validating => view! { <div class="route-loading">"Checking admin access..."</div> }.into_any(),
        AdminDecision::Authorized => children().into_any(),
        AdminDecision::Redirected => ().into_any(),
    }
}
