//! `/profile/:id` route: look the user up and replace the entry with the
//! canonical `/m/{username}` or `/l/{username}` URL.
//!
//! The core `CanonicalRedirect` decides when a lookup is needed and discards
//! answers that arrive after the id, query or component has moved on. A
//! failed or empty lookup leaves the placeholder in place.

use std::sync::Arc;

use encore::nav::Location;
use encore::redirect::{CanonicalRedirect, navigator_identity};
use leptos::prelude::*;
use leptos_router::hooks::{use_location, use_params_map};

use crate::util::navigate::router_navigator;

#[component]
pub fn LegacyProfileRedirect() -> impl IntoView {
    let params = use_params_map();
    let location = use_location();
    let navigator = router_navigator();
    let navigator_id = navigator_identity(&navigator);
    let resolver = StoredValue::new_local(CanonicalRedirect::new());

    Effect::new(move || {
        let id = params.with(|p| p.get("id")).unwrap_or_default();
        let here = Location::new(location.pathname.get(), location.search.get());
        let Some(pending) = resolver.try_update_value(|r| r.begin(&id, &here, navigator_id)).flatten() else {
            return;
        };

        #[cfg(feature = "hydrate")]
        {
            let navigator = Arc::clone(&navigator);
            leptos::task::spawn_local(async move {
                let outcome = crate::net::api::fetch_profile_summary(&pending.user_id).await;
                pending.complete(outcome, &*navigator);
            });
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (pending, Arc::clone(&navigator));
        }
    });

    on_cleanup(move || {
        resolver.try_update_value(CanonicalRedirect::teardown);
    });

    view! { <div class="profile-redirect">"Loading profile..."</div> }
}
