//! The sensor feed: a single record the device keeps overwriting.
//!
//! [`DeviceFeed`] holds the latest [`DeviceData`] in a `watch` channel.
//! Publishing a value equal to the current one is a no-op, so subscribers are
//! only woken by real changes. Each change gets the next sequence number.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::tracking::types::{parse_observation_time, Flow, Mood, NewEntry, Pain, Sleep, Source};

/// Raw record written by the device. Every field is a free-form string and
/// may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl DeviceData {
    /// Normalize into a device-sourced entry. Missing or unrecognized fields
    /// become `NotRecorded`; an unparseable timestamp leaves the observation
    /// time to the store but keeps the raw string.
    pub fn to_new_entry(&self) -> NewEntry {
        NewEntry {
            flow: Flow::from_feed(self.flow.as_deref()),
            mood: Mood::from_feed(self.mood.as_deref()),
            pain: Pain::from_feed(self.pain.as_deref()),
            sleep: Sleep::from_feed(self.sleep.as_deref()),
            recorded_at: self.timestamp.as_deref().and_then(parse_observation_time),
            source: Source::Device,
            device_timestamp: self
                .timestamp
                .as_deref()
                .map(str::trim)
                .filter(|ts| !ts.is_empty())
                .map(str::to_string),
        }
    }
}

/// One accepted change to the feed record.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedUpdate {
    /// Monotonic per feed, starting at 1.
    pub seq: u64,
    pub data: DeviceData,
    pub received_at: DateTime<Utc>,
}

/// Shared handle to the singleton feed record. Clones share the record.
#[derive(Debug, Clone)]
pub struct DeviceFeed {
    tx: Arc<watch::Sender<Option<FeedUpdate>>>,
}

impl Default for DeviceFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceFeed {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Overwrite the record. Returns `false` (and wakes nobody) when `data`
    /// equals the current value.
    pub fn publish(&self, data: DeviceData) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if current.as_ref().map(|update| &update.data) == Some(&data) {
                return false;
            }
            let seq = current.as_ref().map_or(1, |update| update.seq + 1);
            *current = Some(FeedUpdate {
                seq,
                data,
                received_at: Utc::now(),
            });
            true
        });
        tracing::debug!(changed, "device feed written");
        changed
    }

    /// The latest accepted update, if the device has written at all.
    pub fn latest(&self) -> Option<FeedUpdate> {
        self.tx.borrow().clone()
    }

    pub fn current(&self) -> Option<DeviceData> {
        self.tx.borrow().as_ref().map(|update| update.data.clone())
    }

    /// Subscribe to changes. The value present at subscription time counts
    /// as already seen.
    pub fn subscribe(&self) -> watch::Receiver<Option<FeedUpdate>> {
        self.tx.subscribe()
    }
}
