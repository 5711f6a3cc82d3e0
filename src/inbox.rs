//! Realtime unread-message count for the signed-in user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Page chrome shows how many inbox messages are unread. The hook follows
//! the session's user: when a user appears it fetches the count once, then
//! joins `unread-messages:{user_id}` and recounts on every insert or update
//! to that user's messages. Losing or switching the user, or tearing the hook
//! down, closes the subscription exactly once.
//!
//! DESIGN
//! ======
//! Each activation (one user) takes an [`EpochToken`]. Recounts finish
//! asynchronously and possibly out of order; a result is applied only if its
//! token is still current, so nothing lands after a user change or teardown.
//! Failed counts are logged and leave the last known value in place. A
//! failed subscribe leaves the user without a live channel; the next
//! `set_user` for that user retries it.

#[cfg(test)]
#[path = "inbox_test.rs"]
mod inbox_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::{
    ChangeKind, ChangeListener, ChannelSpec, RealtimeClient, Subscription, SubscriptionHandle, TableClient,
};
use crate::data::MESSAGES;
use crate::data::messages::count_unread;
use crate::epoch::{Epoch, EpochToken};
use crate::session::SessionHandle;

/// Channel carrying `user_id`'s inbox changes.
#[must_use]
pub fn inbox_channel(user_id: &str) -> ChannelSpec {
    ChannelSpec::new(format!("unread-messages:{user_id}"))
        .listen(ChangeListener::new(ChangeKind::Insert, MESSAGES).where_eq("receiver_id", user_id))
        .listen(ChangeListener::new(ChangeKind::Update, MESSAGES).where_eq("receiver_id", user_id))
}

#[derive(Default)]
struct Active {
    user_id: Option<String>,
    handle: Option<SubscriptionHandle>,
    pump: Option<JoinHandle<()>>,
}

pub struct UnreadCount<C: ?Sized, R: ?Sized> {
    tables: Arc<C>,
    realtime: Arc<R>,
    count: Arc<watch::Sender<u64>>,
    epoch: Epoch,
    active: Mutex<Active>,
}

impl<C, R> UnreadCount<C, R>
where
    C: TableClient + ?Sized + 'static,
    R: RealtimeClient + ?Sized,
{
    pub fn new(tables: Arc<C>, realtime: Arc<R>) -> Self {
        let (count, _) = watch::channel(0);
        Self { tables, realtime, count: Arc::new(count), epoch: Epoch::new(), active: Mutex::new(Active::default()) }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        *self.count.borrow()
    }

    /// Receiver notified on every count change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.count.subscribe()
    }

    /// The user whose messages are being counted.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.lock().user_id.clone()
    }

    /// Follow `user_id`. The same user again is a no-op once its subscription
    /// is live; a different user, `None`, or a retry after a failed subscribe
    /// ends the current activation first. `None` resets the count to 0.
    pub async fn set_user(&self, user_id: Option<&str>) {
        {
            let active = self.lock();
            if active.user_id.as_deref() == user_id && (user_id.is_none() || active.handle.is_some()) {
                return;
            }
        }
        let token = {
            let mut active = self.lock();
            self.stop(&mut active);
            active.user_id = user_id.map(str::to_owned);
            self.epoch.token()
        };
        let Some(user_id) = user_id else {
            self.count.send_replace(0);
            tracing::debug!("unread count cleared; no user");
            return;
        };

        recount(&*self.tables, &self.count, user_id, &token).await;

        let Subscription { mut events, handle } = match self.realtime.subscribe(inbox_channel(user_id)).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "unread subscription failed; count will not update live");
                return;
            }
        };

        let mut active = self.lock();
        if !token.is_current() {
            handle.close();
            return;
        }
        let tables = self.tables.clone();
        let count = self.count.clone();
        let owner = user_id.to_owned();
        let pump_token = token.clone();
        active.pump = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if !pump_token.is_current() {
                    break;
                }
                tracing::debug!(kind = event.kind.as_str(), user_id = %owner, "inbox changed");
                recount(&*tables, &count, &owner, &pump_token).await;
            }
            tracing::debug!(user_id = %owner, "unread event stream ended");
        }));
        active.handle = Some(handle);
        tracing::debug!(user_id, "unread count live");
    }

    /// Recount now for the current user, if any.
    pub async fn refresh(&self) {
        let (user_id, token) = {
            let active = self.lock();
            (active.user_id.clone(), self.epoch.token())
        };
        if let Some(user_id) = user_id {
            recount(&*self.tables, &self.count, &user_id, &token).await;
        }
    }

    /// End the current activation: close the subscription, stop processing
    /// events and discard in-flight recounts. The last count stays readable.
    pub fn teardown(&self) {
        let mut active = self.lock();
        self.stop(&mut active);
        active.user_id = None;
    }

    /// Drive [`UnreadCount::set_user`] from session changes until the session
    /// store goes away, then tear down.
    pub async fn follow_session(&self, mut session: SessionHandle) {
        loop {
            let current = session.current_and_mark_seen();
            if !current.loading {
                self.set_user(current.user_id()).await;
            }
            if !session.changed().await {
                break;
            }
        }
        self.teardown();
    }

    /// Caller holds the lock, so a concurrent `set_user` sees the advanced
    /// epoch before it can install a handle.
    fn stop(&self, active: &mut Active) {
        self.epoch.advance();
        if let Some(pump) = active.pump.take() {
            pump.abort();
        }
        if let Some(handle) = active.handle.take() {
            handle.close();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Active> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: ?Sized, R: ?Sized> Drop for UnreadCount<C, R> {
    fn drop(&mut self) {
        let active = self.active.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(pump) = active.pump.take() {
            pump.abort();
        }
    }
}

async fn recount<C>(tables: &C, count: &watch::Sender<u64>, user_id: &str, token: &EpochToken)
where
    C: TableClient + ?Sized,
{
    match count_unread(tables, user_id).await {
        Ok(n) if token.is_current() => {
            count.send_replace(n);
            tracing::debug!(user_id, unread = n, "unread count updated");
        }
        Ok(_) => tracing::debug!(user_id, "discarding stale unread count"),
        // Already logged at the data boundary; keep the last known count.
        Err(_) => {}
    }
}
