//! Signed-in landing page.

use encore::session::Session;
use leptos::prelude::*;

use crate::state::session::sign_out;

#[component]
pub fn HomePage() -> impl IntoView {
    let session = expect_context::<RwSignal<Session>>();
    let who = move || {
        session.with(|s| s.user.as_ref().and_then(|u| u.email.clone()).unwrap_or_else(|| "you".to_owned()))
    };

    view! {
        <section class="home">
            <h1>"Welcome back, " {who}</h1>
            <button class="home__sign-out" on:click=move |_| sign_out(session)>
                "Sign Out"
            </button>
        </section>
    }
}
