//! Mirrors the device feed into a user's entry collection.
//!
//! [`listen`] starts a task that waits for feed changes and appends each new
//! value as a device-sourced entry. The returned [`ListenerHandle`] owns the
//! subscription; cancelling or dropping it detaches the listener.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::device::feed::DeviceFeed;
use crate::tracking::store::EntrySink;

/// Owns a running ingestion listener. Dropping the handle stops it.
#[derive(Debug)]
pub struct ListenerHandle {
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Detach the listener. Changes published afterwards are not written.
    pub fn cancel(self) {
        drop(self);
    }

    /// `false` once the listener has stopped (cancelled, or the feed is gone).
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Subscribe to `feed` and append every change to `user_id`'s entries.
///
/// The value present at subscription time is not written; only changes after
/// this call are. Write failures are logged and the listener keeps running.
pub fn listen<S: EntrySink>(
    feed: &DeviceFeed,
    sink: Arc<S>,
    user_id: impl Into<String>,
) -> ListenerHandle {
    let user_id = user_id.into();
    let mut rx = feed.subscribe();
    // Taken before spawning so a publish racing the task's first poll is seen.
    let mut last_seq = rx.borrow_and_update().as_ref().map_or(0, |update| update.seq);

    let task = tokio::spawn(async move {
        tracing::info!(user = %user_id, "device listener attached");

        while rx.changed().await.is_ok() {
            let Some(update) = rx.borrow_and_update().clone() else {
                continue;
            };
            // Sequence numbers only grow; anything at or below the last one
            // was already written.
            if update.seq <= last_seq {
                continue;
            }
            last_seq = update.seq;

            let entry = update.data.to_new_entry();
            match sink.append(&user_id, entry).await {
                Ok(stored) => tracing::info!(
                    user = %user_id,
                    id = %stored.id,
                    seq = update.seq,
                    flow = %stored.flow,
                    "device reading stored"
                ),
                Err(e) => tracing::warn!(
                    user = %user_id,
                    seq = update.seq,
                    error = %e,
                    "failed to store device reading"
                ),
            }
        }

        tracing::info!(user = %user_id, "device feed closed, listener stopping");
    });

    ListenerHandle { task }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::db;
    use crate::device::feed::DeviceData;
    use crate::tracking::identity;
    use crate::tracking::store::{EntrySource, EntryStore};
    use crate::tracking::types::Flow;

    fn reading(flow: &str) -> DeviceData {
        DeviceData {
            flow: Some(flow.into()),
            ..DeviceData::default()
        }
    }

    #[tokio::test]
    async fn publish_right_after_listen_is_written() {
        let conn = db::open_memory_database().unwrap();
        let user_id = identity::sign_in_anonymously(&conn).unwrap();
        let store = EntryStore::new(conn);
        let mut changes = store.changes();
        let feed = DeviceFeed::new();

        let _listener = listen(&feed, Arc::new(store.clone()), user_id.clone());
        // No yield: the listener task has not been polled yet.
        feed.publish(reading("heavy"));

        tokio::time::timeout(Duration::from_secs(1), changes.recv())
            .await
            .expect("reading published after listen was never written")
            .unwrap();
        let entries = store.recent(&user_id, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].flow, Flow::Heavy);
    }

    #[tokio::test]
    async fn value_held_before_listen_is_skipped() {
        let conn = db::open_memory_database().unwrap();
        let user_id = identity::sign_in_anonymously(&conn).unwrap();
        let store = EntryStore::new(conn);
        let feed = DeviceFeed::new();
        feed.publish(reading("heavy"));

        let _listener = listen(&feed, Arc::new(store.clone()), user_id.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.count(&user_id).await.unwrap(), 0);
    }
}
