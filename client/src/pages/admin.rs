//! Admin landing page, rendered only behind `RequireAdmin`.

use encore::guard::AdminSession;
use leptos::prelude::*;

use crate::util::storage::BrowserStore;

#[component]
pub fn AdminPage() -> impl IntoView {
    let on_leave = move |_| {
        AdminSession::clear(&BrowserStore::local());
        #[cfg(feature = "hydrate")]
        {
            if let Some(window) = web_sys::window() {
                let _ = window.location().set_href(encore::guard::ADMIN_LOGIN_PATH);
            }
        }
    };

    view! {
        <section class="admin">
            <h1>"Admin"</h1>
            <button class="admin__leave" on:click=on_leave>"Leave Admin"</button>
        </section>
    }
}
