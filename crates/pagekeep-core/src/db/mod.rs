//! SQLite persistence for list records and ordered indexes.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so snapshot reads do not block fetch-completion writes
//! - `busy_timeout = 5s` to ride out transient lock contention
//! - `foreign_keys = ON` so index rows cannot outlive their list record

pub mod migrations;
pub mod repo;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

use crate::error::ErrorCode;

pub use repo::{ListRepository, SqliteListRepository};

/// Busy timeout used for list store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the list database, apply runtime pragmas, and migrate
/// the schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create list store directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path).with_context(|| {
        format!(
            "{}: open list database {}",
            ErrorCode::StoreOpenFailed,
            path.display()
        )
    })?;

    configure_connection(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply list store migrations")?;

    Ok(conn)
}

/// Open a migrated, process-private in-memory database.
///
/// # Errors
///
/// Returns an error if SQLite cannot allocate or migrate the database.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory list database")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enable foreign keys")?;
    migrations::migrate(&mut conn).context("apply list store migrations")?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}
