//! pagekeep-core library.
//!
//! Keeps large, paginated, remotely-sourced lists in a local SQLite cache
//! and hands out immutable, diffable snapshots of them.
//!
//! - [`descriptor`]: which list is wanted, and its stable identities.
//! - [`store`]: persisted list records and ordered indexes, fetch
//!   bookkeeping, change events.
//! - [`manager`] / [`sectioned`]: snapshots with lazy item resolution and
//!   optional presentational grouping.
//! - [`diff`]: edit scripts between two snapshots.
//! - [`feed`] / [`worker`]: background build-then-diff with staleness checks.

pub mod config;
pub mod db;
pub mod descriptor;
pub mod diff;
pub mod error;
pub mod event;
pub mod feed;
pub mod manager;
pub mod model;
pub mod sectioned;
pub mod source;
pub mod store;
pub mod worker;

#[cfg(test)]
mod testing;

// Conventions:
// - Errors: `StoreError` for engine operations, `anyhow::Result` for
//   open/bootstrap helpers.
// - Logging: `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub use config::EngineConfig;
pub use descriptor::{ListDescriptor, ListId, ListIdentity, ListTypeId};
pub use diff::{DiffResult, DiffStats, Edit, ListUpdateCallback, calculate_diff, diff_snapshots};
pub use error::{ErrorCode, StoreError};
pub use event::{ChangeCause, ListEvent, Subscription};
pub use feed::{FeedSnapshot, FeedUpdate, ListFeed};
pub use manager::{ItemRef, ListManager};
pub use model::{ListRecord, ListState, RemoteId};
pub use sectioned::{ChunkedSections, Entry, GroupingPolicy, SectionMarker, SectionedListManager};
pub use source::{ListItem, ListItemDataSource};
pub use store::{FetchedPage, ListStore};
pub use worker::{TaskHandle, WorkerPool};
