//! SQL DDL for all FlowFriend tables.
//!
//! Defines the `users`, `entries` and `schema_meta` tables. Entries are
//! append-only: triggers abort any `UPDATE` or `DELETE` against them. All DDL
//! uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

/// All schema DDL statements for the version-1 tables.
const SCHEMA_SQL: &str = r#"
-- Anonymous identities and their profile
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT,
    avg_cycle_length INTEGER NOT NULL DEFAULT 28 CHECK(avg_cycle_length > 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Per-user tracking entries
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    flow TEXT NOT NULL DEFAULT 'not_recorded'
        CHECK(flow IN ('none','light_spotting','moderate','heavy','extra_heavy','not_recorded')),
    mood TEXT NOT NULL DEFAULT 'not_recorded'
        CHECK(mood IN ('super_sad','only_okay','comfy_cozy','super_duper','extra_angry','not_recorded')),
    pain TEXT NOT NULL DEFAULT 'not_recorded'
        CHECK(pain IN ('none','back_pain','stomach_cramps','pelvic_pain','headaches','not_recorded')),
    sleep TEXT NOT NULL DEFAULT 'not_recorded'
        CHECK(sleep IN ('no_battery','still_sleepy','decent','feeling_good','fully_powered','not_recorded')),
    recorded_at TEXT NOT NULL,
    source TEXT NOT NULL CHECK(source IN ('device','manual')),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_user_recorded ON entries(user_id, recorded_at);

CREATE TRIGGER IF NOT EXISTS entries_no_update BEFORE UPDATE ON entries
BEGIN
    SELECT RAISE(ABORT, 'entries are append-only');
END;

CREATE TRIGGER IF NOT EXISTS entries_no_delete BEFORE DELETE ON entries
BEGIN
    SELECT RAISE(ABORT, 'entries are append-only');
END;

-- Schema metadata and the current anonymous identity
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
