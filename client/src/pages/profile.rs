//! Canonical profile route (`/m/:username` for musicians, `/l/:username` for
//! listeners).

#[cfg(test)]
#[path = "profile_test.rs"]
mod profile_test;

use leptos::prelude::*;
use leptos_router::hooks::{use_location, use_params_map};

/// Label for the route prefix a profile was reached through.
fn kind_label(path: &str) -> &'static str {
    if path.starts_with("/m/") { "Musician" } else { "Listener" }
}

#[component]
pub fn ProfilePage() -> impl IntoView {
    let params = use_params_map();
    let location = use_location();
    let username = move || params.with(|p| p.get("username")).unwrap_or_default();
    let kind = move || kind_label(&location.pathname.get());

    view! {
        <section class="profile">
            <p class="profile__kind">{kind}</p>
            <h1 class="profile__name">"@" {username}</h1>
        </section>
    }
}
