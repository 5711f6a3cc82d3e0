//! REST helpers for the hosted backend.
//!
//! Client-side (hydrate): real HTTP calls via `gloo-net` against the auth
//! (`/auth/v1`) and table (`/rest/v1`) services. Server-side (SSR): stubs
//! returning `None`/error since these calls only make sense in the browser.
//!
//! The backend URL and public key are baked in at build time from
//! `ENCORE_BACKEND_URL` and `ENCORE_ANON_KEY`.
//!
//! ERROR HANDLING
//! ==============
//! Callers get `Option`/`Result` outputs instead of panics so auth/profile
//! fetch failures degrade UI behavior without crashing hydration.

#![allow(clippy::unused_async)]

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use encore::config::BackendConfig;
use encore::data::ProfileSummary;
use encore::session::UserIdentity;
#[cfg(feature = "hydrate")]
use serde::Deserialize;

/// Build-time backend settings, if both were provided.
pub fn backend_config() -> Option<BackendConfig> {
    let url = option_env!("ENCORE_BACKEND_URL")?;
    let anon_key = option_env!("ENCORE_ANON_KEY")?;
    Some(BackendConfig::new(url, anon_key))
}

#[cfg(any(test, feature = "hydrate"))]
fn bearer(config: &BackendConfig, access_token: Option<&str>) -> String {
    format!("Bearer {}", access_token.unwrap_or(&config.anon_key))
}

#[cfg(any(test, feature = "hydrate"))]
fn table_endpoint(config: &BackendConfig, table: &str) -> String {
    format!("{}/{table}", config.rest_url())
}

#[cfg(any(test, feature = "hydrate"))]
fn password_grant_endpoint(config: &BackendConfig) -> String {
    format!("{}/token?grant_type=password", config.auth_url())
}

#[cfg(any(test, feature = "hydrate"))]
fn request_failed_message(operation: &str, status: u16) -> String {
    format!("{operation} failed: {status}")
}

#[cfg(feature = "hydrate")]
#[derive(Deserialize)]
struct TokenGrant {
    access_token: String,
    user: UserIdentity,
}

/// Signed-in user for `access_token`, or `None` if the token is rejected or
/// the backend cannot be reached.
pub async fn fetch_current_user(access_token: &str) -> Option<UserIdentity> {
    #[cfg(feature = "hydrate")]
    {
        let config = backend_config()?;
        let resp = gloo_net::http::Request::get(&format!("{}/user", config.auth_url()))
            .header("apikey", &config.anon_key)
            .header("Authorization", &bearer(&config, Some(access_token)))
            .send()
            .await
            .ok()?;
        if !resp.ok() {
            return None;
        }
        resp.json::<UserIdentity>().await.ok()
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = access_token;
        None
    }
}

/// Email + password sign-in. Returns the access token and the user.
///
/// # Errors
///
/// Returns a display-ready message if the request fails or is refused.
pub async fn sign_in(email: &str, password: &str) -> Result<(String, UserIdentity), String> {
    #[cfg(feature = "hydrate")]
    {
        let config = backend_config().ok_or("backend is not configured")?;
        let resp = gloo_net::http::Request::post(&password_grant_endpoint(&config))
            .header("apikey", &config.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .map_err(|e| e.to_string())?
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.ok() {
            return Err(request_failed_message("sign-in", resp.status()));
        }
        let grant = resp.json::<TokenGrant>().await.map_err(|e| e.to_string())?;
        Ok((grant.access_token, grant.user))
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (email, password);
        Err("not available on server".to_owned())
    }
}

/// Revoke `access_token` remotely. Failures are ignored.
pub async fn logout(access_token: &str) {
    #[cfg(feature = "hydrate")]
    {
        let Some(config) = backend_config() else {
            return;
        };
        let _ = gloo_net::http::Request::post(&format!("{}/logout", config.auth_url()))
            .header("apikey", &config.anon_key)
            .header("Authorization", &bearer(&config, Some(access_token)))
            .send()
            .await;
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = access_token;
    }
}

/// Username and user type for `user_id`, or `Ok(None)` when no row exists.
///
/// # Errors
///
/// Returns a display-ready message if the lookup fails or does not decode.
pub async fn fetch_profile_summary(user_id: &str) -> Result<Option<ProfileSummary>, String> {
    #[cfg(feature = "hydrate")]
    {
        use encore::store::KeyValueStore;

        let config = backend_config().ok_or("backend is not configured")?;
        let query = encore::data::profile_summary_query(user_id);
        let pairs = query.to_pairs();
        let token = crate::util::storage::BrowserStore::local().get(crate::state::session::ACCESS_TOKEN_KEY);
        let resp = gloo_net::http::Request::get(&table_endpoint(&config, &query.table))
            .query(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .header("apikey", &config.anon_key)
            .header("Authorization", &bearer(&config, token.as_deref()))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.ok() {
            return Err(request_failed_message("profile lookup", resp.status()));
        }
        let rows = resp.json::<Vec<ProfileSummary>>().await.map_err(|e| e.to_string())?;
        Ok(rows.into_iter().next())
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = user_id;
        Err("not available on server".to_owned())
    }
}
