//! Live "most recent N entries" view for the signed-in identity.
//!
//! An [`EntryQuery`] owns a background task that follows the auth state. For
//! each identity it subscribes to store changes, publishes a snapshot, and
//! re-reads on every change for that user (and optionally on a timer). When
//! the identity changes the old subscription is dropped before the new one
//! starts. The view is published through a `watch` channel.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::tracking::store::EntrySource;
use crate::tracking::types::Entry;

/// What a screen renders: the entries plus whether the first snapshot for
/// the current identity has arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct EntriesView {
    pub entries: Vec<Entry>,
    pub loading: bool,
}

impl EntriesView {
    fn loading() -> Self {
        Self {
            entries: Vec::new(),
            loading: true,
        }
    }
}

/// Handle to a running live query. Dropping it stops the query.
pub struct EntryQuery {
    view: watch::Receiver<EntriesView>,
    publisher: Publisher,
    task: JoinHandle<()>,
}

impl EntryQuery {
    /// Start following `auth`, keeping the `limit` newest entries in view.
    pub fn subscribe<S: EntrySource>(
        source: Arc<S>,
        auth: watch::Receiver<Option<String>>,
        limit: usize,
    ) -> Self {
        Self::subscribe_with_refresh(source, auth, limit, None)
    }

    /// Like [`EntryQuery::subscribe`], additionally re-reading every
    /// `refresh` so writes from other processes appear.
    pub fn subscribe_with_refresh<S: EntrySource>(
        source: Arc<S>,
        auth: watch::Receiver<Option<String>>,
        limit: usize,
        refresh: Option<Duration>,
    ) -> Self {
        let (tx, view) = watch::channel(EntriesView::loading());
        let publisher = Publisher::new(tx);
        let task = tokio::spawn(run(source, auth, limit, refresh, publisher.clone()));
        Self {
            view,
            publisher,
            task,
        }
    }

    /// A receiver for the current view.
    pub fn view(&self) -> watch::Receiver<EntriesView> {
        self.view.clone()
    }

    pub fn current(&self) -> EntriesView {
        self.view.borrow().clone()
    }

    /// Wait until the first snapshot for the current identity has arrived.
    pub async fn ready(&mut self) -> EntriesView {
        let _ = self.view.wait_for(|view| !view.loading).await;
        self.view.borrow().clone()
    }

    /// Stop the query. No further view updates are published.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for EntryQuery {
    fn drop(&mut self) {
        self.publisher.close();
        self.task.abort();
    }
}

/// Publishes into the view until closed. The sender lives behind the same
/// lock that `close` takes, so nothing is sent once `close` returns.
#[derive(Clone)]
struct Publisher {
    slot: Arc<Mutex<Option<watch::Sender<EntriesView>>>>,
}

impl Publisher {
    fn new(tx: watch::Sender<EntriesView>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(tx))),
        }
    }

    fn publish(&self, view: EntriesView) {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = slot.as_ref() else {
            return;
        };
        tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }

    fn close(&self) {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

async fn run<S: EntrySource>(
    source: Arc<S>,
    mut auth: watch::Receiver<Option<String>>,
    limit: usize,
    refresh: Option<Duration>,
    publisher: Publisher,
) {
    let mut auth_open = true;
    let mut previous: Option<Option<String>> = None;

    loop {
        let user = auth.borrow_and_update().clone();
        if previous.as_ref() != Some(&user) {
            publisher.publish(EntriesView::loading());
            previous = Some(user.clone());
        }

        let following = async {
            match user.as_deref() {
                Some(user_id) => follow(&*source, user_id, limit, refresh, &publisher).await,
                None => std::future::pending::<()>().await,
            }
        };

        let outcome = if auth_open {
            tokio::select! {
                _ = following => Wake::StreamClosed,
                changed = auth.changed() => Wake::AuthChanged(changed.is_ok()),
            }
        } else {
            following.await;
            Wake::StreamClosed
        };

        match outcome {
            // Change stream closed; nothing more arrives until the identity
            // changes.
            Wake::StreamClosed => {
                if !auth_open || auth.changed().await.is_err() {
                    return;
                }
            }
            Wake::AuthChanged(true) => {
                tracing::debug!("auth state changed, re-subscribing entry query");
            }
            // The identity can no longer change: keep following the last one.
            Wake::AuthChanged(false) => auth_open = false,
        }
    }
}

enum Wake {
    StreamClosed,
    /// `false` once the auth sender is gone.
    AuthChanged(bool),
}

async fn follow<S: EntrySource>(
    source: &S,
    user_id: &str,
    limit: usize,
    refresh: Option<Duration>,
    publisher: &Publisher,
) {
    // Subscribe before the first read so no append slips between them.
    let mut changes = source.changes();
    snapshot(source, user_id, limit, publisher).await;

    let mut ticker = refresh.map(|period| {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval
    });
    if let Some(interval) = ticker.as_mut() {
        // The first tick completes immediately.
        interval.tick().await;
    }

    loop {
        let tick = async {
            match ticker.as_mut() {
                Some(interval) => {
                    interval.tick().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            change = changes.recv() => match change {
                Ok(change) if change.user_id == user_id => {
                    snapshot(source, user_id, limit, publisher).await;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "entry query lagged, re-reading");
                    snapshot(source, user_id, limit, publisher).await;
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
            _ = tick => {
                snapshot(source, user_id, limit, publisher).await;
            }
        }
    }
}

async fn snapshot<S: EntrySource>(source: &S, user_id: &str, limit: usize, publisher: &Publisher) {
    let view = match source.recent(user_id, limit).await {
        Ok(entries) => EntriesView {
            entries,
            loading: false,
        },
        Err(e) => {
            tracing::warn!(user = %user_id, error = %e, "entry snapshot failed");
            EntriesView {
                entries: Vec::new(),
                loading: false,
            }
        }
    };
    publisher.publish(view);
}
