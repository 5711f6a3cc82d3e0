//! Root component: context providers and the route table.

use leptos::prelude::*;
use leptos_meta::{Title, provide_meta_context};
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

use crate::components::legacy_profile_redirect::LegacyProfileRedirect;
use crate::components::require_admin::RequireAdmin;
use crate::components::require_auth::RequireAuth;
use crate::pages::admin::AdminPage;
use crate::pages::admin_login::AdminLoginPage;
use crate::pages::home::HomePage;
use crate::pages::login::LoginPage;
use crate::pages::profile::ProfilePage;
use crate::state::session;

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();
    let session = session::provide_session();
    session::restore_session(session);

    view! {
        <Title text="encore"/>
        <Router>
            <main class="app">
                <Routes fallback=|| view! { <p class="not-found">"Page not found."</p> }>
                    <Route path=path!("/login") view=LoginPage/>
                    <Route path=path!("/") view=|| view! { <RequireAuth><HomePage/></RequireAuth> }/>
                    <Route path=path!("/admin/login") view=AdminLoginPage/>
                    <Route path=path!("/admin") view=|| view! { <RequireAdmin><AdminPage/></RequireAdmin> }/>
                    <Route path=path!("/profile/:id") view=LegacyProfileRedirect/>
                    <Route path=path!("/m/:username") view=ProfilePage/>
                    <Route path=path!("/l/:username") view=ProfilePage/>
                </Routes>
            </main>
        </Router>
    }
}
