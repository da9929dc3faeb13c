//! Anonymous identity issuance, profile storage, and the auth state that
//! live views follow.

use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::watch;

use crate::db::migrations::{get_meta, set_meta};
use crate::tracking::store::to_db_time;
use crate::tracking::types::User;

/// `schema_meta` key holding the identity this installation signed in as.
pub const CURRENT_USER_KEY: &str = "current_user";

/// Cycle length assumed until the user says otherwise.
pub const DEFAULT_CYCLE_LENGTH: u32 = 28;

/// Create a fresh anonymous user row and return its id. Does not change the
/// current identity.
pub fn issue_identity(conn: &Connection) -> Result<String> {
    let id = uuid::Uuid::now_v7().to_string();
    ensure_user(conn, &id)?;
    Ok(id)
}

/// Make sure a user row exists for `user_id`, creating an unnamed profile if
/// it does not.
pub fn ensure_user(conn: &Connection, user_id: &str) -> Result<()> {
    let now = to_db_time(&Utc::now());
    conn.execute(
        "INSERT OR IGNORE INTO users (id, name, avg_cycle_length, created_at, updated_at) \
         VALUES (?1, NULL, ?2, ?3, ?3)",
        params![user_id, DEFAULT_CYCLE_LENGTH, now],
    )?;
    Ok(())
}

/// The identity this installation is signed in as, if any.
pub fn current_user_id(conn: &Connection) -> Result<Option<String>> {
    Ok(get_meta(conn, CURRENT_USER_KEY)?)
}

/// Return the stored identity, issuing and recording a new one on first
/// launch.
pub fn sign_in_anonymously(conn: &Connection) -> Result<String> {
    if let Some(id) = current_user_id(conn)? {
        ensure_user(conn, &id)?;
        return Ok(id);
    }

    let id = issue_identity(conn)?;
    set_meta(conn, CURRENT_USER_KEY, &id)?;
    tracing::info!(user = %id, "issued anonymous identity");
    Ok(id)
}

/// Load a user's profile.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, avg_cycle_length, created_at, updated_at FROM users WHERE id = ?1",
            params![user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    avg_cycle_length: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

/// Upsert a profile with merge semantics: fields passed as `None` keep their
/// stored value (or the default on insert).
pub fn save_user(
    conn: &Connection,
    user_id: &str,
    name: Option<&str>,
    avg_cycle_length: Option<u32>,
) -> Result<User> {
    if avg_cycle_length == Some(0) {
        bail!("average cycle length must be at least one day");
    }

    ensure_user(conn, user_id)?;
    let now = to_db_time(&Utc::now());
    conn.execute(
        "UPDATE users SET name = COALESCE(?2, name), \
         avg_cycle_length = COALESCE(?3, avg_cycle_length), updated_at = ?4 WHERE id = ?1",
        params![user_id, name, avg_cycle_length, now],
    )?;

    match get_user(conn, user_id)? {
        Some(user) => Ok(user),
        None => bail!("user {user_id} vanished during save"),
    }
}

/// Who is signed in, published to every live view.
///
/// Starts signed out; [`AuthState::sign_in`] publishes an identity and every
/// subscribed [`EntryQuery`](crate::tracking::query::EntryQuery) re-subscribes.
#[derive(Debug)]
pub struct AuthState {
    tx: watch::Sender<Option<String>>,
}

impl AuthState {
    pub fn signed_out() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn signed_in(user_id: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(Some(user_id.into()));
        Self { tx }
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        self.tx.send_if_modified(|current| {
            if current.as_deref() == Some(user_id.as_str()) {
                false
            } else {
                *current = Some(user_id);
                true
            }
        });
    }

    pub fn sign_out(&self) {
        self.tx.send_if_modified(|current| current.take().is_some());
    }

    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}
