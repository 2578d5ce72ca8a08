//! Canonical SQLite schema for the list store.
//!
//! - `lists` holds one metadata row per list identity
//! - `list_entries` holds the ordered index; rows are owned by their list and
//!   removed with it
//! - `store_meta` records the applied schema version

/// Migration v1: list records, ordered entries, and store metadata.
pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS lists (
    list_id INTEGER PRIMARY KEY,
    type_id INTEGER NOT NULL,
    state TEXT NOT NULL CHECK (
        state IN ('needs_refresh', 'fetched', 'fetching_first_page', 'loading_more', 'error')
    ),
    error_message TEXT,
    can_load_more INTEGER NOT NULL DEFAULT 0 CHECK (can_load_more IN (0, 1)),
    last_fetched_offset INTEGER,
    created_at_us INTEGER NOT NULL,
    last_modified_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS list_entries (
    list_id INTEGER NOT NULL REFERENCES lists(list_id) ON DELETE CASCADE,
    position INTEGER NOT NULL CHECK (position >= 0),
    remote_item_id INTEGER,
    marker_id INTEGER,
    PRIMARY KEY (list_id, position),
    CHECK ((remote_item_id IS NULL) <> (marker_id IS NULL))
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
"#;

/// Migration v2: family and reverse-lookup indexes.
pub const MIGRATION_V2_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_lists_type
    ON lists(type_id);

CREATE INDEX IF NOT EXISTS idx_lists_last_modified
    ON lists(last_modified_us);

CREATE INDEX IF NOT EXISTS idx_list_entries_remote
    ON list_entries(remote_item_id);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
"#;

/// Indexes expected by invalidation and expiry paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_lists_type",
    "idx_lists_last_modified",
    "idx_list_entries_remote",
];
