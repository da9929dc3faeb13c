//! Sensor feed and its ingestion into the entry store.

pub mod feed;
pub mod ingest;

pub use feed::{DeviceData, DeviceFeed, FeedUpdate};
pub use ingest::{listen, ListenerHandle};
