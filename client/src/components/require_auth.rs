//! Gate children on a signed-in session.
//!
//! While the session is loading a placeholder renders; once it settles
//! without a user the current path is remembered in `sessionStorage` and the
//! router replaces the entry with `/login`. The core `RouteGuard` makes both
//! decisions, this component only feeds it the session and location.

use encore::guard::{Guarded, RouteGuard};
use encore::nav::Location;
use encore::session::Session;
use leptos::prelude::*;
use leptos_router::hooks::use_location;

use crate::util::navigate::router_navigator;
use crate::util::storage::BrowserStore;

#[component]
pub fn RequireAuth(children: ChildrenFn) -> impl IntoView {
    let session = expect_context::<RwSignal<Session>>();
    let location = use_location();
    let guard = StoredValue::new_local(RouteGuard::new(router_navigator(), BrowserStore::session()));
    let outcome = RwSignal::new(Guarded::<()>::Loading);

    Effect::new(move || {
        let current = session.get();
        let here = Location::new(location.pathname.get_untracked(), location.search.get_untracked());
        let next = guard.try_update_value(|g| g.evaluate(&current, &here, || ())).unwrap_or(Guarded::Loading);
        outcome.set(next);
    });

    move || match outcome.get() {
        Guarded::Loading => view! { <div class="route-loading">"Loading..."</div> }.into_any(),
        Guarded::Content(()) => children().into_any(),
        Guarded::Redirecting => ().into_any(),
    }
}
