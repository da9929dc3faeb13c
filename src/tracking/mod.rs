//! Per-user tracking data: entry types, the append-only store, anonymous
//! identity, and live queries.

pub mod identity;
pub mod query;
pub mod seed;
pub mod store;
pub mod types;

pub use query::{EntriesView, EntryQuery};
pub use store::{EntryChange, EntrySink, EntrySource, EntryStore};
pub use types::{Entry, Flow, Mood, NewEntry, Pain, Sleep, Source, User};
