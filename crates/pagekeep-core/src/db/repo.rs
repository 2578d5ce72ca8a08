//! Repository interface over list records and their ordered index.
//!
//! [`ListRepository`] is the only way the rest of the crate touches
//! persistence. Ownership of index rows by their record is enforced here:
//! every delete path removes `list_entries` rows explicitly inside the same
//! transaction as the `lists` row, independent of the schema's foreign key.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::collections::HashSet;
use tracing::warn;

use crate::descriptor::{ListId, ListTypeId};
use crate::error::{ErrorCode, StoreError};
use crate::model::{IndexEntry, ListRecord, ListState, RemoteId};

type Result<T> = std::result::Result<T, StoreError>;

/// Storage operations needed by the list store.
pub trait ListRepository: Send {
    fn get_record(&self, id: ListId) -> Result<Option<ListRecord>>;

    /// Insert or overwrite the record keyed by `record.id`.
    fn put_record(&mut self, record: &ListRecord) -> Result<()>;

    /// Ordered index of a list; empty when the list has no rows.
    fn index_entries(&self, id: ListId) -> Result<Vec<IndexEntry>>;

    fn index_len(&self, id: ListId) -> Result<usize>;

    /// Append entries after the current last position; returns the new length.
    fn append_index_entries(&mut self, id: ListId, entries: &[IndexEntry]) -> Result<usize>;

    /// Replace the whole index of a list.
    fn replace_index_entries(&mut self, id: ListId, entries: &[IndexEntry]) -> Result<()>;

    /// Delete a record and its index; returns whether a record existed.
    fn delete_record(&mut self, id: ListId) -> Result<bool>;

    /// Delete every record and index row; returns the number of records.
    fn delete_all(&mut self) -> Result<usize>;

    fn delete_by_type(&mut self, type_id: ListTypeId) -> Result<usize>;

    /// Delete records not modified since `cutoff`.
    fn delete_older_than(&mut self, cutoff: DateTime<Utc>) -> Result<usize>;

    fn list_ids_of_type(&self, type_id: ListTypeId) -> Result<Vec<ListId>>;

    /// Remove the given remote ids from every list of a family, closing the
    /// gaps they leave. Returns the lists that changed.
    fn remove_remote_ids(&mut self, type_id: ListTypeId, ids: &[RemoteId])
    -> Result<Vec<ListId>>;

    /// Demote persisted in-flight states left behind by a previous process.
    fn reset_in_flight(&mut self) -> Result<usize>;
}

/// [`ListRepository`] backed by a migrated SQLite connection.
#[derive(Debug)]
pub struct SqliteListRepository {
    conn: Connection,
}

impl SqliteListRepository {
    /// Wrap a connection that has already been migrated
    /// (see [`crate::db::open_store`]).
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

const RECORD_COLUMNS: &str = "list_id, type_id, state, error_message, can_load_more, \
                              last_fetched_offset, created_at_us, last_modified_us";

impl ListRepository for SqliteListRepository {
    fn get_record(&self, id: ListId) -> Result<Option<ListRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM lists WHERE list_id = ?1");
        let record = self
            .conn
            .query_row(&sql, [sql_id(id.0)], record_from_row)
            .optional()?;
        Ok(record)
    }

    fn put_record(&mut self, record: &ListRecord) -> Result<()> {
        let error_message = record.error_message().map(str::to_string);
        let offset = record.last_fetched_offset.map(sql_len);
        self.conn.execute(
            "INSERT INTO lists (
                list_id, type_id, state, error_message, can_load_more,
                last_fetched_offset, created_at_us, last_modified_us
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(list_id) DO UPDATE SET
                type_id = excluded.type_id,
                state = excluded.state,
                error_message = excluded.error_message,
                can_load_more = excluded.can_load_more,
                last_fetched_offset = excluded.last_fetched_offset,
                last_modified_us = excluded.last_modified_us",
            params![
                sql_id(record.id.0),
                sql_id(record.type_id.0),
                record.state.as_str(),
                error_message,
                record.can_load_more,
                offset,
                record.created_at.timestamp_micros(),
                record.last_modified.timestamp_micros(),
            ],
        )?;
        Ok(())
    }

    fn index_entries(&self, id: ListId) -> Result<Vec<IndexEntry>> {
        Ok(read_entries(&self.conn, id)?)
    }

    fn index_len(&self, id: ListId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM list_entries WHERE list_id = ?1",
            [sql_id(id.0)],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn append_index_entries(&mut self, id: ListId, entries: &[IndexEntry]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let start: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM list_entries WHERE list_id = ?1",
            [sql_id(id.0)],
            |row| row.get(0),
        )?;
        insert_entries(&tx, id, start, entries)?;
        tx.commit()?;
        Ok(usize::try_from(start).unwrap_or(0) + entries.len())
    }

    fn replace_index_entries(&mut self, id: ListId, entries: &[IndexEntry]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM list_entries WHERE list_id = ?1",
            [sql_id(id.0)],
        )?;
        insert_entries(&tx, id, 0, entries)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_record(&mut self, id: ListId) -> Result<bool> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM list_entries WHERE list_id = ?1",
            [sql_id(id.0)],
        )?;
        let removed = tx.execute("DELETE FROM lists WHERE list_id = ?1", [sql_id(id.0)])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn delete_all(&mut self) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM list_entries", [])?;
        let removed = tx.execute("DELETE FROM lists", [])?;
        tx.commit()?;
        Ok(removed)
    }

    fn delete_by_type(&mut self, type_id: ListTypeId) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM list_entries
             WHERE list_id IN (SELECT list_id FROM lists WHERE type_id = ?1)",
            [sql_id(type_id.0)],
        )?;
        let removed = tx.execute("DELETE FROM lists WHERE type_id = ?1", [sql_id(type_id.0)])?;
        tx.commit()?;
        Ok(removed)
    }

    fn delete_older_than(&mut self, cutoff: DateTime<Utc>) -> Result<usize> {
        let cutoff_us = cutoff.timestamp_micros();
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM list_entries
             WHERE list_id IN (SELECT list_id FROM lists WHERE last_modified_us < ?1)",
            [cutoff_us],
        )?;
        let removed = tx.execute("DELETE FROM lists WHERE last_modified_us < ?1", [cutoff_us])?;
        tx.commit()?;
        Ok(removed)
    }

    fn list_ids_of_type(&self, type_id: ListTypeId) -> Result<Vec<ListId>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT list_id FROM lists WHERE type_id = ?1 ORDER BY list_id")?;
        let rows = stmt.query_map([sql_id(type_id.0)], |row| {
            row.get::<_, i64>(0).map(|id| ListId(from_sql_id(id)))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn remove_remote_ids(
        &mut self,
        type_id: ListTypeId,
        ids: &[RemoteId],
    ) -> Result<Vec<ListId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT DISTINCT e.list_id
             FROM list_entries e
             JOIN lists l ON l.list_id = e.list_id
             WHERE l.type_id = ? AND e.remote_item_id IN ({placeholders})
             ORDER BY e.list_id"
        );
        let mut bind: Vec<i64> = Vec::with_capacity(ids.len() + 1);
        bind.push(sql_id(type_id.0));
        bind.extend(ids.iter().map(|id| id.0));

        let tx = self.conn.transaction()?;
        let affected: Vec<ListId> = {
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(bind.iter()), |row| {
                row.get::<_, i64>(0).map(|id| ListId(from_sql_id(id)))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let doomed: HashSet<RemoteId> = ids.iter().copied().collect();
        for list_id in &affected {
            let kept: Vec<IndexEntry> = read_entries(&tx, *list_id)?
                .into_iter()
                .filter(|entry| entry.remote_id().is_none_or(|id| !doomed.contains(&id)))
                .collect();
            tx.execute(
                "DELETE FROM list_entries WHERE list_id = ?1",
                [sql_id(list_id.0)],
            )?;
            insert_entries(&tx, *list_id, 0, &kept)?;
        }
        tx.commit()?;

        Ok(affected)
    }

    fn reset_in_flight(&mut self) -> Result<usize> {
        let updated = self.conn.execute(
            "UPDATE lists
             SET state = CASE state
                 WHEN 'fetching_first_page' THEN 'needs_refresh'
                 ELSE 'fetched'
             END
             WHERE state IN ('fetching_first_page', 'loading_more')",
            [],
        )?;
        Ok(updated)
    }
}

fn read_entries(conn: &Connection, id: ListId) -> rusqlite::Result<Vec<IndexEntry>> {
    let mut stmt = conn.prepare_cached(
        "SELECT remote_item_id, marker_id
         FROM list_entries
         WHERE list_id = ?1
         ORDER BY position ASC",
    )?;
    let rows = stmt.query_map([sql_id(id.0)], |row| {
        let remote: Option<i64> = row.get(0)?;
        let marker: Option<i64> = row.get(1)?;
        Ok(remote.map_or_else(
            || IndexEntry::Marker(marker.unwrap_or_default()),
            |remote| IndexEntry::Remote(RemoteId(remote)),
        ))
    })?;
    rows.collect()
}

fn insert_entries(
    conn: &Connection,
    id: ListId,
    start: i64,
    entries: &[IndexEntry],
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO list_entries (list_id, position, remote_item_id, marker_id)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut position = start;
    for entry in entries {
        let (remote, marker) = match entry {
            IndexEntry::Remote(remote) => (Some(remote.0), None),
            IndexEntry::Marker(marker) => (None, Some(*marker)),
        };
        stmt.execute(params![sql_id(id.0), position, remote, marker])?;
        position += 1;
    }
    Ok(())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ListRecord> {
    let id = ListId(from_sql_id(row.get(0)?));
    let raw_state: String = row.get(2)?;
    let error_message: Option<String> = row.get(3)?;
    let state = match raw_state.parse::<ListState>() {
        Ok(ListState::Error { .. }) => ListState::Error {
            message: error_message.unwrap_or_default(),
        },
        Ok(state) => state,
        Err(err) => {
            warn!(code = %ErrorCode::CorruptRecord, list_id = %id, "{err}; treating list as unfetched");
            ListState::NeedsRefresh
        }
    };
    let offset: Option<i64> = row.get(5)?;

    Ok(ListRecord {
        id,
        type_id: ListTypeId(from_sql_id(row.get(1)?)),
        state,
        can_load_more: row.get(4)?,
        last_fetched_offset: offset.and_then(|offset| usize::try_from(offset).ok()),
        created_at: from_micros(row.get(6)?),
        last_modified: from_micros(row.get(7)?),
    })
}

/// Store a 64-bit identifier bit-for-bit in an SQLite INTEGER.
const fn sql_id(id: u64) -> i64 {
    i64::from_le_bytes(id.to_le_bytes())
}

const fn from_sql_id(id: i64) -> u64 {
    u64::from_le_bytes(id.to_le_bytes())
}

fn sql_len(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

fn from_micros(us: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(us).unwrap_or_default()
}
