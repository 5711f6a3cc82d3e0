//! Password sign-in against the hosted identity service (`/auth/v1`).
//!
//! SYSTEM CONTEXT
//! ==============
//! `AuthClient` is the native [`IdentityProvider`]. It owns the access and
//! refresh tokens, writes the access token into the shared [`AccessToken`]
//! that the REST and realtime clients read, and broadcasts an [`AuthEvent`]
//! for every sign-in, refresh, sign-out and expiry. The session store
//! consumes that stream through `session::run_identity_sync`.
//!
//! Grants carrying `expires_in` are refreshed by a background task shortly
//! before they lapse. A refresh the service rejects clears the tokens and
//! emits [`AuthEvent::TokenExpired`], which signs the session out.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::rest::checked;
use super::{AccessToken, IdentityProvider};
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::session::{AuthEvent, UserIdentity};

const EVENT_CAPACITY: usize = 32;
/// Refresh this long before the access token lapses.
const REFRESH_MARGIN_SECS: u64 = 60;
/// Back-off after a refresh attempt that failed for a transient reason.
const REFRESH_RETRY_SECS: u64 = 10;

/// Token grant as returned by `/auth/v1/token`.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: UserIdentity,
}

/// How long to wait before refreshing a token valid for `expires_in` seconds.
/// Short-lived tokens are refreshed halfway through their lifetime.
#[must_use]
pub fn refresh_delay(expires_in: u64) -> Duration {
    Duration::from_secs(expires_in.saturating_sub(REFRESH_MARGIN_SECS).max(expires_in / 2))
}

pub struct AuthClient {
    shared: Arc<Shared>,
}

/// State reachable from both the client and its scheduled refresh task.
struct Shared {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    token: AccessToken,
    refresh_token: Mutex<Option<String>>,
    refresher: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthClient {
    /// # Errors
    ///
    /// Returns [`BackendError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig, token: AccessToken) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Shared {
            http,
            base_url: config.auth_url(),
            anon_key: config.anon_key.clone(),
            token,
            refresh_token: Mutex::new(None),
            refresher: Mutex::new(None),
            events,
        };
        Ok(Self { shared: Arc::new(shared) })
    }

    /// The token cell this client writes; share it with REST and realtime.
    #[must_use]
    pub fn access_token(&self) -> &AccessToken {
        &self.shared.token
    }

    /// Exchange email and password for a session. A grant that carries
    /// `expires_in` schedules its own refresh.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Status`] for rejected credentials and
    /// transport or decode errors otherwise.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<UserIdentity, BackendError> {
        let grant = self.shared.grant("password", json!({ "email": email, "password": password })).await?;
        let user = grant.user.clone();
        self.shared.install(grant);
        tracing::info!(user_id = %user.id, "signed in");
        self.shared.emit(AuthEvent::SignedIn(user.clone()));
        Ok(user)
    }

    /// Trade the stored refresh token for a new access token now.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthenticated`] when no refresh token is
    /// held; a rejected refresh also signs the client out locally.
    pub async fn refresh_session(&self) -> Result<UserIdentity, BackendError> {
        let grant = self.shared.refresh_grant().await?;
        let user = grant.user.clone();
        self.shared.install(grant);
        self.shared.emit(AuthEvent::TokenRefreshed(user.clone()));
        Ok(user)
    }

    /// Revoke the session remotely and forget it locally. The local state is
    /// cleared even if the remote call fails.
    ///
    /// # Errors
    ///
    /// Returns the remote failure after local sign-out has happened.
    pub async fn sign_out(&self) -> Result<(), BackendError> {
        let shared = &self.shared;
        let result = match shared.token.get() {
            Some(access) => {
                let request = shared
                    .http
                    .post(format!("{}/logout", shared.base_url))
                    .header("apikey", &shared.anon_key)
                    .bearer_auth(access);
                match request.send().await {
                    Ok(response) => checked(response).await.map(|_| ()),
                    Err(e) => Err(e.into()),
                }
            }
            None => Ok(()),
        };
        shared.forget();
        shared.emit(AuthEvent::SignedOut);
        if let Err(e) = &result {
            tracing::warn!(error = %e, "remote sign-out failed; signed out locally");
        }
        result
    }
}

impl Drop for AuthClient {
    fn drop(&mut self) {
        self.shared.stop_refresher();
    }
}

impl Shared {
    async fn grant(&self, grant_type: &str, body: serde_json::Value) -> Result<TokenGrant, BackendError> {
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;
        let response = checked(response).await?;
        Ok(response.json::<TokenGrant>().await?)
    }

    /// Refresh grant. A rejection clears the tokens and reports
    /// [`AuthEvent::TokenExpired`]; the caller installs a success.
    async fn refresh_grant(&self) -> Result<TokenGrant, BackendError> {
        let refresh_token = self.lock_refresh().clone().ok_or(BackendError::Unauthenticated)?;
        match self.grant("refresh_token", json!({ "refresh_token": refresh_token })).await {
            Err(e @ BackendError::Status { status: 400 | 401, .. }) => {
                tracing::info!(error = %e, "refresh rejected; session expired");
                self.clear_tokens();
                self.emit(AuthEvent::TokenExpired);
                Err(e)
            }
            other => other,
        }
    }

    /// Store the grant's tokens and replace any scheduled refresh.
    fn install(self: &Arc<Self>, grant: TokenGrant) {
        let expires_in = grant.expires_in;
        self.store_tokens(grant);
        self.stop_refresher();
        if let Some(expires_in) = expires_in {
            let task = tokio::spawn(run_refresher(Arc::clone(self), refresh_delay(expires_in)));
            *self.lock_refresher() = Some(task);
        }
    }

    fn store_tokens(&self, grant: TokenGrant) {
        self.token.set(grant.access_token);
        *self.lock_refresh() = grant.refresh_token;
    }

    fn forget(&self) {
        self.stop_refresher();
        self.clear_tokens();
    }

    fn clear_tokens(&self) {
        self.token.clear();
        *self.lock_refresh() = None;
    }

    fn stop_refresher(&self) {
        if let Some(task) = self.lock_refresher().take() {
            task.abort();
        }
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine: nothing is watching the session yet.
        let _ = self.events.send(event);
    }

    fn lock_refresh(&self) -> MutexGuard<'_, Option<String>> {
        self.refresh_token.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_refresher(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.refresher.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keep the session alive: refresh before each grant lapses until a refresh
/// is rejected. Runs as the task held in `Shared::refresher`, so it stores
/// new tokens directly instead of going through `install`.
async fn run_refresher(shared: Arc<Shared>, mut delay: Duration) {
    loop {
        tokio::time::sleep(delay).await;
        match shared.refresh_grant().await {
            Ok(grant) => {
                let user = grant.user.clone();
                let Some(expires_in) = grant.expires_in else {
                    shared.store_tokens(grant);
                    shared.emit(AuthEvent::TokenRefreshed(user));
                    break;
                };
                shared.store_tokens(grant);
                tracing::debug!(user_id = %user.id, expires_in, "access token refreshed");
                shared.emit(AuthEvent::TokenRefreshed(user));
                delay = refresh_delay(expires_in);
            }
            Err(BackendError::Status { status: 400 | 401, .. } | BackendError::Unauthenticated) => break,
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed; retrying");
                delay = Duration::from_secs(REFRESH_RETRY_SECS);
            }
        }
    }
    // Dropping our own handle does not cancel us.
    shared.lock_refresher().take();
}

#[async_trait::async_trait]
impl IdentityProvider for AuthClient {
    /// `Ok(None)` when no token is held. A token the service no longer
    /// accepts is dropped and reported as [`AuthEvent::TokenExpired`].
    async fn current_user(&self) -> Result<Option<UserIdentity>, BackendError> {
        let shared = &self.shared;
        let Some(access) = shared.token.get() else {
            return Ok(None);
        };
        let response = shared
            .http
            .get(format!("{}/user", shared.base_url))
            .header("apikey", &shared.anon_key)
            .bearer_auth(access)
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!("access token rejected; session expired");
            shared.forget();
            shared.emit(AuthEvent::TokenExpired);
            return Ok(None);
        }
        let response = checked(response).await?;
        Ok(Some(response.json::<UserIdentity>().await?))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.shared.events.subscribe()
    }
}
