pub mod chat;
pub mod doctor;
pub mod log;
pub mod predict;
pub mod profile;
pub mod screens;
pub mod seed;

use std::sync::Arc;

use anyhow::{Context, Result};

use flowfriend::config::FlowFriendConfig;
use flowfriend::db;
use flowfriend::tracking::identity;
use flowfriend::tracking::EntryStore;

/// What every command that touches the entry log needs: the opened store and
/// the signed-in anonymous identity.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<FlowFriendConfig>,
    pub store: EntryStore,
    pub user_id: String,
}

impl AppContext {
    /// Open the database and sign in, issuing an identity on first launch.
    pub fn open(config: FlowFriendConfig) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = db::open_database(&db_path)?;
        let user_id = identity::sign_in_anonymously(&conn).context("anonymous sign-in failed")?;
        tracing::info!(db = %db_path.display(), user = %user_id, "database ready");

        Ok(Self {
            config: Arc::new(config),
            store: EntryStore::new(conn),
            user_id,
        })
    }
}
