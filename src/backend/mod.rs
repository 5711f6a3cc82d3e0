//! Hosted backend collaborators: identity, tables, realtime.
//!
//! ARCHITECTURE
//! ============
//! `query` and `change` describe requests and realtime envelopes and are
//! shared with the browser client. The traits below are the seams the
//! session store, data-access functions and the unread-count hook depend on;
//! `auth`, `rest` and `realtime` implement them natively over HTTP and
//! websockets.

pub mod change;
pub mod query;

#[cfg(feature = "native")]
pub mod auth;
#[cfg(feature = "native")]
pub mod realtime;
#[cfg(feature = "native")]
pub mod rest;

use std::sync::{Arc, RwLock};

pub use change::{ChangeEvent, ChangeKind, ChangeListener, ChannelSpec};
pub use query::{Filter, Order, Page, SelectQuery};

/// Bearer token shared between the auth client (writer) and the REST and
/// realtime clients (readers).
#[derive(Clone, Debug, Default)]
pub struct AccessToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl AccessToken {
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.inner.read().ok()?.clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = Some(token.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = None;
        }
    }
}

#[cfg(feature = "native")]
pub use native::*;

#[cfg(feature = "native")]
mod native {
    use serde_json::Value;
    use tokio::sync::{broadcast, mpsc, oneshot};
    use uuid::Uuid;

    use super::change::{ChangeEvent, ChannelSpec};
    use super::query::{Filter, SelectQuery};
    use crate::error::BackendError;
    use crate::session::{AuthEvent, UserIdentity};

    /// Source of the signed-in identity and of sign-in/out notifications.
    #[async_trait::async_trait]
    pub trait IdentityProvider: Send + Sync {
        /// Who is signed in right now, if anyone.
        ///
        /// # Errors
        ///
        /// Returns a [`BackendError`] if the identity service cannot be reached.
        async fn current_user(&self) -> Result<Option<UserIdentity>, BackendError>;

        /// Stream of identity changes from this point on.
        fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
    }

    /// Row-level operations against remote tables.
    #[async_trait::async_trait]
    pub trait TableClient: Send + Sync {
        async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>, BackendError>;

        /// Insert one row and return the stored representation.
        async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>, BackendError>;

        async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError>;

        /// Exact count of rows matching every filter.
        async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, BackendError>;
    }

    /// Opens realtime change subscriptions.
    #[async_trait::async_trait]
    pub trait RealtimeClient: Send + Sync {
        /// Join `spec` and start delivering matching change events.
        ///
        /// # Errors
        ///
        /// Returns a [`BackendError`] if the channel cannot be joined.
        async fn subscribe(&self, spec: ChannelSpec) -> Result<Subscription, BackendError>;
    }

    /// An open subscription: the event stream plus the handle that ends it.
    #[derive(Debug)]
    pub struct Subscription {
        pub events: mpsc::UnboundedReceiver<ChangeEvent>,
        pub handle: SubscriptionHandle,
    }

    /// Ownership of one open channel. Closing consumes the handle, so a
    /// channel can be closed at most once; dropping an unclosed handle closes
    /// it too.
    #[derive(Debug)]
    pub struct SubscriptionHandle {
        id: Uuid,
        channel: String,
        close_tx: Option<oneshot::Sender<()>>,
    }

    impl SubscriptionHandle {
        /// `close_tx` fires when the owner closes or drops the handle; the
        /// channel task leaves the channel when it does.
        #[must_use]
        pub fn new(channel: impl Into<String>, close_tx: oneshot::Sender<()>) -> Self {
            Self { id: Uuid::new_v4(), channel: channel.into(), close_tx: Some(close_tx) }
        }

        #[must_use]
        pub fn id(&self) -> Uuid {
            self.id
        }

        #[must_use]
        pub fn channel(&self) -> &str {
            &self.channel
        }

        pub fn close(self) {
            tracing::debug!(channel = %self.channel, id = %self.id, "closing subscription");
        }
    }

    impl Drop for SubscriptionHandle {
        fn drop(&mut self) {
            if let Some(tx) = self.close_tx.take() {
                let _ = tx.send(());
            }
        }
    }
}
