//! Admin login page at `/admin/login`.
//!
//! Signs in with email + password like the user login, then requires the
//! account's metadata to carry `role: "admin"`. Only then is the local admin
//! flag written and the browser sent (replace) to `/admin`. The flag is what
//! `RequireAdmin` checks; the backend's own policies still decide what the
//! account may read.

#[cfg(test)]
#[path = "admin_login_test.rs"]
mod admin_login_test;

use leptos::prelude::*;

pub const ADMIN_HOME_PATH: &str = "/admin";

/// Trimmed email and the raw password, or the message to show.
fn validate_admin_credentials(email: &str, password: &str) -> Result<(String, String), &'static str> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err("Enter both admin email and password.");
    }
    Ok((email.to_owned(), password.to_owned()))
}

/// Whether the signed-in account is marked as an administrator.
#[cfg(any(test, feature = "hydrate"))]
fn is_admin_identity(user: &encore::session::UserIdentity) -> bool {
    user.metadata.get("role").and_then(serde_json::Value::as_str) == Some("admin")
}

#[component]
pub fn AdminLoginPage() -> impl IntoView {
    let email = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let info = RwSignal::new(String::new());
    let busy = RwSignal::new(false);

    #[cfg(feature = "hydrate")]
    let session = expect_context::<RwSignal<encore::session::Session>>();
    #[cfg(feature = "hydrate")]
    let navigate = leptos_router::hooks::use_navigate();

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if busy.get() {
            return;
        }
        let (email_value, password_value) = match validate_admin_credentials(&email.get(), &password.get()) {
            Ok(credentials) => credentials,
            Err(message) => {
                info.set(message.to_owned());
                return;
            }
        };
        busy.set(true);
        info.set("Signing in...".to_owned());

        #[cfg(feature = "hydrate")]
        {
            let navigate = navigate.clone();
            leptos::task::spawn_local(async move {
                use encore::guard::AdminSession;
                use encore::session::AuthEvent;
                use encore::store::KeyValueStore;

                use crate::state::session::{ACCESS_TOKEN_KEY, apply_event};
                use crate::util::storage::BrowserStore;

                match crate::net::api::sign_in(&email_value, &password_value).await {
                    Ok((token, user)) if is_admin_identity(&user) => {
                        BrowserStore::local().set(ACCESS_TOKEN_KEY, &token);
                        apply_event(session, &AuthEvent::SignedIn(user));
                        AdminSession { is_admin: true }.store(&BrowserStore::local());
                        navigate(ADMIN_HOME_PATH, leptos_router::NavigateOptions { replace: true, ..Default::default() });
                    }
                    Ok((token, _)) => {
                        crate::net::api::logout(&token).await;
                        AdminSession::clear(&BrowserStore::local());
                        info.set("This account is not an administrator.".to_owned());
                        busy.set(false);
                    }
                    Err(e) => {
                        info.set(format!("Sign-in failed: {e}"));
                        busy.set(false);
                    }
                }
            });
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (email_value, password_value);
        }
    };

    view! {
        <div class="login-page">
            <div class="login-card">
                <h1>"encore admin"</h1>
                <form class="login-form" on:submit=on_submit>
                    <input
                        class="login-input"
                        type="email"
                        placeholder="admin@example.com"
                        prop:value=move || email.get()
                        on:input=move |ev| email.set(event_target_value(&ev))
                    />
                    <input
                        class="login-input"
                        type="password"
                        placeholder="Password"
                        prop:value=move || password.get()
                        on:input=move |ev| password.set(event_target_value(&ev))
                    />
                    <button class="login-button" type="submit" disabled=move || busy.get()>
                        "Sign In"
                    </button>
                </form>
                <Show when=move || !info.get().is_empty()>
                    <p class="login-message">{move || info.get()}</p>
                </Show>
            </div>
        </div>
    }
}
