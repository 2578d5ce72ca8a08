//! The list store: owner of persisted list state and its change events.
//!
//! All writes go through one repository lock and each read-modify-write is
//! done while holding it, so concurrent fetch completions for the same list
//! are applied one at a time. Data-source calls are always made after the
//! lock is released; a source may report results synchronously from inside
//! `fetch_list` without deadlocking.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::db::{self, ListRepository, SqliteListRepository};
use crate::descriptor::{ListDescriptor, ListIdentity, ListTypeId};
use crate::error::{ErrorCode, StoreError};
use crate::event::{ChangeCause, EventHub, ListEvent, Subscription};
use crate::manager::ListManager;
use crate::model::{IndexEntry, ListRecord, ListState, RemoteId};
use crate::sectioned::{GroupingPolicy, SectionedListManager};
use crate::source::{ListItem, ListItemDataSource};

type Result<T> = std::result::Result<T, StoreError>;

/// A page of remote ids reported by a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Offset the page was requested at.
    pub offset: usize,
    pub remote_ids: Vec<RemoteId>,
    /// Whether the remote has more ids after this page.
    pub can_load_more: bool,
}

impl FetchedPage {
    #[must_use]
    pub const fn new(offset: usize, remote_ids: Vec<RemoteId>, can_load_more: bool) -> Self {
        Self {
            offset,
            remote_ids,
            can_load_more,
        }
    }
}

pub struct ListStore {
    repo: Mutex<Box<dyn ListRepository>>,
    events: EventHub,
    config: EngineConfig,
}

impl std::fmt::Debug for ListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListStore")
            .field("config", &self.config)
            .field("subscribers", &self.events.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl ListStore {
    /// Wrap a repository. In-flight states persisted by an earlier process
    /// are demoted, since their fetches can never complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-flight reset fails.
    pub fn new(mut repo: impl ListRepository + 'static, config: EngineConfig) -> Result<Arc<Self>> {
        let reset = repo.reset_in_flight()?;
        if reset > 0 {
            debug!(count = reset, "reset interrupted list fetches");
        }
        Ok(Arc::new(Self {
            repo: Mutex::new(Box::new(repo)),
            events: EventHub::new(),
            config,
        }))
    }

    /// Open an on-disk SQLite store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path, config: EngineConfig) -> anyhow::Result<Arc<Self>> {
        let conn = db::open_store(path)?;
        Ok(Self::new(SqliteListRepository::new(conn), config)?)
    }

    /// Open a process-private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot create the database.
    pub fn in_memory(config: EngineConfig) -> anyhow::Result<Arc<Self>> {
        let conn = db::open_in_memory()?;
        Ok(Self::new(SqliteListRepository::new(conn), config)?)
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    #[must_use]
    pub const fn events(&self) -> &EventHub {
        &self.events
    }

    pub(crate) fn repo(&self) -> Result<MutexGuard<'_, Box<dyn ListRepository>>> {
        Ok(self.repo.lock()?)
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Build a list manager snapshot for `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record or index cannot be read.
    pub fn list_manager<D: ListDescriptor, T: ListItem>(
        self: &Arc<Self>,
        descriptor: D,
        source: Arc<dyn ListItemDataSource<D, T>>,
    ) -> Result<ListManager<D, T>> {
        ListManager::load(Arc::clone(self), descriptor, source)
    }

    /// Build a sectioned snapshot for `descriptor` using `policy`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record or index cannot be read.
    pub fn sectioned_list_manager<D: ListDescriptor, T: ListItem>(
        self: &Arc<Self>,
        descriptor: D,
        source: Arc<dyn ListItemDataSource<D, T>>,
        policy: &dyn GroupingPolicy<T>,
    ) -> Result<SectionedListManager<D, T>> {
        let manager = self.list_manager(descriptor, source)?;
        Ok(SectionedListManager::new(manager, policy))
    }

    /// Current record for a descriptor, created on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub fn record<D: ListDescriptor>(&self, descriptor: &D) -> Result<ListRecord> {
        let mut repo = self.repo()?;
        load_or_create(repo.as_mut(), descriptor.identity(), Utc::now())
    }

    /// Record plus ordered index, read under one lock.
    pub(crate) fn read_list(&self, identity: ListIdentity) -> Result<(ListRecord, Vec<IndexEntry>)> {
        let mut repo = self.repo()?;
        let record = load_or_create(repo.as_mut(), identity, Utc::now())?;
        let entries = repo.index_entries(identity.id)?;
        Ok((record, entries))
    }

    // -----------------------------------------------------------------------
    // Fetch requests
    // -----------------------------------------------------------------------

    /// Ask the data source for the first page.
    ///
    /// Dropped (returns `false`) while a first-page fetch for the same list
    /// is already outstanding.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be updated.
    pub fn refresh<D, T, S>(&self, descriptor: &D, source: &S) -> Result<bool>
    where
        D: ListDescriptor,
        T: ListItem,
        S: ListItemDataSource<D, T> + ?Sized,
    {
        let identity = descriptor.identity();
        {
            let mut repo = self.repo()?;
            let mut record = load_or_create(repo.as_mut(), identity, Utc::now())?;
            if record.is_fetching_first_page() {
                debug!(list_id = %identity.id, "first page already in flight; refresh dropped");
                return Ok(false);
            }
            record.state = ListState::FetchingFirstPage;
            record.last_fetched_offset = Some(0);
            record.last_modified = Utc::now();
            repo.put_record(&record)?;
        }

        self.publish_changed(identity, ChangeCause::FetchStarted);
        source.fetch_list(descriptor, 0);
        Ok(true)
    }

    /// Ask the data source for the page after the current index.
    ///
    /// A no-op (returns `false`) while any fetch is in flight, before a first
    /// page has completed for an empty list, or after the source reported
    /// the last page.
    ///
    /// # Errors
    ///
    /// Returns an error if the record or index cannot be read or updated.
    pub fn load_more<D, T, S>(&self, descriptor: &D, source: &S) -> Result<bool>
    where
        D: ListDescriptor,
        T: ListItem,
        S: ListItemDataSource<D, T> + ?Sized,
    {
        let identity = descriptor.identity();
        let offset = {
            let mut repo = self.repo()?;
            let mut record = load_or_create(repo.as_mut(), identity, Utc::now())?;
            let len = repo.index_len(identity.id)?;

            if record.state.is_in_flight() {
                debug!(list_id = %identity.id, state = %record.state, "fetch in flight; load more skipped");
                return Ok(false);
            }
            if len == 0 && !record.has_fetched() {
                debug!(list_id = %identity.id, "no first page yet; load more skipped");
                return Ok(false);
            }
            if !record.can_load_more {
                debug!(list_id = %identity.id, "no more remote pages; load more skipped");
                return Ok(false);
            }

            record.state = ListState::LoadingMore;
            record.last_fetched_offset = Some(len);
            record.last_modified = Utc::now();
            repo.put_record(&record)?;
            len
        };

        self.publish_changed(identity, ChangeCause::FetchStarted);
        source.fetch_list(descriptor, offset);
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Update entry points
    // -----------------------------------------------------------------------

    /// Apply a fetched page reported by the data source.
    ///
    /// A first page replaces the index; later pages append ids not already
    /// present. Pages that no longer match the outstanding request (the list
    /// was invalidated, refreshed again, or the offset moved on) are dropped
    /// and `false` is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub fn on_list_fetched<D: ListDescriptor>(
        &self,
        descriptor: &D,
        page: FetchedPage,
    ) -> Result<bool> {
        let identity = descriptor.identity();
        {
            let mut repo = self.repo()?;
            let Some(mut record) = repo.get_record(identity.id)? else {
                debug!(list_id = %identity.id, "page for removed list dropped");
                return Ok(false);
            };

            let expected = record.state.is_in_flight() && record.last_fetched_offset == Some(page.offset);
            if !expected && page.offset != 0 {
                debug!(
                    list_id = %identity.id,
                    offset = page.offset,
                    state = %record.state,
                    "stale page dropped"
                );
                return Ok(false);
            }

            if page.offset == 0 {
                let mut seen = HashSet::new();
                let entries: Vec<IndexEntry> = page
                    .remote_ids
                    .iter()
                    .filter(|id| seen.insert(**id))
                    .map(|id| IndexEntry::Remote(*id))
                    .collect();
                repo.replace_index_entries(identity.id, &entries)?;
            } else {
                let present: HashSet<RemoteId> = repo
                    .index_entries(identity.id)?
                    .into_iter()
                    .filter_map(IndexEntry::remote_id)
                    .collect();
                let mut seen = HashSet::new();
                let entries: Vec<IndexEntry> = page
                    .remote_ids
                    .iter()
                    .filter(|id| !present.contains(id) && seen.insert(**id))
                    .map(|id| IndexEntry::Remote(*id))
                    .collect();
                repo.append_index_entries(identity.id, &entries)?;
            }

            record.state = ListState::Fetched;
            record.can_load_more = page.can_load_more;
            record.last_fetched_offset = Some(page.offset);
            record.last_modified = Utc::now();
            repo.put_record(&record)?;
        }

        self.publish_changed(identity, ChangeCause::PageFetched);
        Ok(true)
    }

    /// Record a failed fetch. The index is left untouched.
    ///
    /// Failures for lists with no fetch outstanding are stale and dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub fn on_list_fetch_failed<D: ListDescriptor>(
        &self,
        descriptor: &D,
        message: impl Into<String>,
    ) -> Result<bool> {
        let identity = descriptor.identity();
        {
            let mut repo = self.repo()?;
            let Some(mut record) = repo.get_record(identity.id)? else {
                debug!(list_id = %identity.id, "failure for removed list dropped");
                return Ok(false);
            };
            if !record.state.is_in_flight() {
                debug!(list_id = %identity.id, state = %record.state, "stale failure dropped");
                return Ok(false);
            }
            record.state = ListState::Error {
                message: message.into(),
            };
            record.last_modified = Utc::now();
            repo.put_record(&record)?;
        }

        self.publish_changed(identity, ChangeCause::FetchFailed);
        Ok(true)
    }

    /// Announce that items of a list family changed in the local item store.
    pub fn notify_items_changed(&self, type_id: ListTypeId) {
        self.events.publish(&ListEvent::ItemsChanged { type_id });
    }

    /// Remove remote ids from every list of a family; returns how many
    /// lists changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub fn remove_items(&self, type_id: ListTypeId, remote_ids: &[RemoteId]) -> Result<usize> {
        let affected = self.repo()?.remove_remote_ids(type_id, remote_ids)?;
        if !affected.is_empty() {
            self.events.publish(&ListEvent::ListChanged {
                list_ids: affected.clone(),
                cause: ChangeCause::ItemsRemoved,
            });
        }
        Ok(affected.len())
    }

    // -----------------------------------------------------------------------
    // Invalidation
    // -----------------------------------------------------------------------

    /// Drop every list record and index.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub fn remove_all(&self) -> Result<usize> {
        let removed = self.repo()?.delete_all()?;
        info!(count = removed, "removed all lists");
        self.events.publish(&ListEvent::AllRemoved);
        Ok(removed)
    }

    /// Drop every list of one family.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub fn remove_lists_of_type(&self, type_id: ListTypeId) -> Result<usize> {
        let ids = {
            let mut repo = self.repo()?;
            let ids = repo.list_ids_of_type(type_id)?;
            repo.delete_by_type(type_id)?;
            ids
        };
        info!(type_id = %type_id, count = ids.len(), "removed list family");
        if !ids.is_empty() {
            self.events.publish(&ListEvent::ListChanged {
                list_ids: ids.clone(),
                cause: ChangeCause::Invalidated,
            });
        }
        Ok(ids.len())
    }

    /// Drop lists not modified within `max_age`. No events are published;
    /// this is startup maintenance.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub fn remove_expired(&self, max_age: Duration) -> Result<usize> {
        let cutoff = expiry_cutoff(Utc::now(), max_age);
        let removed = self.repo()?.delete_older_than(cutoff)?;
        if removed > 0 {
            info!(count = removed, %cutoff, "removed expired lists");
        }
        Ok(removed)
    }

    fn publish_changed(&self, identity: ListIdentity, cause: ChangeCause) {
        self.events.publish(&ListEvent::ListChanged {
            list_ids: vec![identity.id],
            cause,
        });
    }
}

/// Read a record, creating it when absent. Index rows found without a record
/// are cache debris and are cleared.
fn load_or_create(
    repo: &mut dyn ListRepository,
    identity: ListIdentity,
    now: DateTime<Utc>,
) -> Result<ListRecord> {
    if let Some(record) = repo.get_record(identity.id)? {
        if record.type_id != identity.type_id {
            warn!(
                code = %ErrorCode::CorruptRecord,
                list_id = %identity.id,
                stored = %record.type_id,
                expected = %identity.type_id,
                "list family mismatch; repairing record"
            );
            let repaired = ListRecord {
                type_id: identity.type_id,
                ..record
            };
            repo.put_record(&repaired)?;
            return Ok(repaired);
        }
        return Ok(record);
    }

    if repo.index_len(identity.id)? > 0 {
        warn!(
            code = %ErrorCode::CorruptRecord,
            list_id = %identity.id,
            "index rows without a list record; clearing"
        );
        repo.delete_record(identity.id)?;
    }

    let record = ListRecord::new(identity, now);
    repo.put_record(&record)?;
    Ok(record)
}

fn expiry_cutoff(now: DateTime<Utc>, max_age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(max_age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
