//! Append-only entry store.
//!
//! [`append_entry`] and [`recent_entries`] are the synchronous write and read
//! paths over a `rusqlite` connection. [`EntryStore`] wraps a shared
//! connection for async callers, runs those paths on the blocking pool, and
//! broadcasts an [`EntryChange`] after every successful append so live views
//! can re-read.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, Row};
use tokio::sync::broadcast;

use crate::tracking::types::{Entry, NewEntry};

/// Capacity of the change broadcast. Lagging receivers re-read the store.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Notification that a user's collection grew.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryChange {
    pub user_id: String,
    pub entry_id: String,
}

/// Read side used by live views.
#[async_trait]
pub trait EntrySource: Send + Sync + 'static {
    /// Most recent entries for a user, newest first.
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<Entry>>;

    /// Subscribe to append notifications for all users.
    fn changes(&self) -> broadcast::Receiver<EntryChange>;
}

/// Write side used by the device listener.
#[async_trait]
pub trait EntrySink: Send + Sync + 'static {
    async fn append(&self, user_id: &str, entry: NewEntry) -> Result<Entry>;
}

/// Format a timestamp the way every `*_at` column stores it. Fixed precision
/// and a `Z` suffix keep lexical and chronological order identical.
pub fn to_db_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_db_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_column<T: std::str::FromStr<Err = String>>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

const ENTRY_COLUMNS: &str =
    "id, user_id, flow, mood, pain, sleep, recorded_at, source, device_timestamp, created_at";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let flow: String = row.get(2)?;
    let mood: String = row.get(3)?;
    let pain: String = row.get(4)?;
    let sleep: String = row.get(5)?;
    let recorded_at: String = row.get(6)?;
    let source: String = row.get(7)?;
    let created_at: String = row.get(9)?;

    Ok(Entry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        flow: parse_column(2, &flow)?,
        mood: parse_column(3, &mood)?,
        pain: parse_column(4, &pain)?,
        sleep: parse_column(5, &sleep)?,
        recorded_at: parse_db_time(6, &recorded_at)?,
        source: parse_column(7, &source)?,
        device_timestamp: row.get(8)?,
        created_at: parse_db_time(9, &created_at)?,
    })
}

/// Append one entry to a user's collection and return the stored record.
///
/// `created_at` is always the store's clock; `recorded_at` falls back to it
/// when the caller did not supply an observation time.
pub fn append_entry(conn: &Connection, user_id: &str, entry: &NewEntry) -> Result<Entry> {
    let now = Utc::now().trunc_subsecs(3);
    let stored = Entry {
        id: uuid::Uuid::now_v7().to_string(),
        user_id: user_id.to_string(),
        flow: entry.flow,
        mood: entry.mood,
        pain: entry.pain,
        sleep: entry.sleep,
        recorded_at: entry.recorded_at.map(|ts| ts.trunc_subsecs(3)).unwrap_or(now),
        source: entry.source,
        device_timestamp: entry.device_timestamp.clone(),
        created_at: now,
    };

    conn.execute(
        "INSERT INTO entries (id, user_id, flow, mood, pain, sleep, recorded_at, source, device_timestamp, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            stored.id,
            stored.user_id,
            stored.flow.as_str(),
            stored.mood.as_str(),
            stored.pain.as_str(),
            stored.sleep.as_str(),
            to_db_time(&stored.recorded_at),
            stored.source.as_str(),
            stored.device_timestamp,
            to_db_time(&stored.created_at),
        ],
    )
    .with_context(|| format!("failed to append entry for user {user_id}"))?;

    Ok(stored)
}

/// Most recent `limit` entries for a user, ordered by `recorded_at`
/// descending. Ties fall back to insertion order, newest first.
pub fn recent_entries(conn: &Connection, user_id: &str, limit: usize) -> Result<Vec<Entry>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM entries WHERE user_id = ?1 \
         ORDER BY recorded_at DESC, rowid DESC LIMIT ?2"
    ))?;

    let entries = stmt
        .query_map(params![user_id, limit], entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Total number of entries a user owns.
pub fn count_entries(conn: &Connection, user_id: &str) -> Result<u64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(n.max(0) as u64)
}

/// Shared, async-friendly handle over the entry tables.
#[derive(Clone)]
pub struct EntryStore {
    conn: Arc<Mutex<Connection>>,
    changes: broadcast::Sender<EntryChange>,
}

impl EntryStore {
    pub fn new(conn: Connection) -> Self {
        Self::from_shared(Arc::new(Mutex::new(conn)))
    }

    pub fn from_shared(conn: Arc<Mutex<Connection>>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { conn, changes }
    }

    /// The underlying connection, for callers that need other tables.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// Run a synchronous closure against the connection on the blocking pool.
    pub async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| anyhow!("db lock poisoned: {e}"))?;
            f(&mut conn)
        })
        .await
        .context("db task failed")?
    }

    pub async fn count(&self, user_id: &str) -> Result<u64> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| count_entries(conn, &user_id)).await
    }
}

#[async_trait]
impl EntrySink for EntryStore {
    async fn append(&self, user_id: &str, entry: NewEntry) -> Result<Entry> {
        let owner = user_id.to_string();
        let stored = self
            .with_conn(move |conn| append_entry(conn, &owner, &entry))
            .await?;

        tracing::debug!(
            user = %stored.user_id,
            id = %stored.id,
            source = %stored.source,
            "entry appended"
        );

        // No receivers is fine: nobody is watching this user.
        let _ = self.changes.send(EntryChange {
            user_id: stored.user_id.clone(),
            entry_id: stored.id.clone(),
        });
        Ok(stored)
    }
}

#[async_trait]
impl EntrySource for EntryStore {
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<Entry>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| recent_entries(conn, &user_id, limit))
            .await
    }

    fn changes(&self) -> broadcast::Receiver<EntryChange> {
        self.changes.subscribe()
    }
}
