//! Immutable list snapshots with lazy item resolution.
//!
//! A [`ListManager`] is built from the persisted record and ordered index of
//! one descriptor. Ids are resolved through the data source's local lookup;
//! ids the lookup does not know stay as [`ItemRef::Loading`] placeholders and
//! are requested from the remote once per load. A manager never changes
//! after construction: refreshing means building a new one.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::descriptor::{ListDescriptor, ListIdentity};
use crate::error::StoreError;
use crate::model::{IndexEntry, ListRecord, RemoteId};
use crate::source::{ListItem, ListItemDataSource};
use crate::store::ListStore;

/// One position of a list: either a resolved item or its pending id.
#[derive(Debug)]
pub enum ItemRef<'a, T> {
    Loading(RemoteId),
    Ready(&'a T),
}

// Manual impls: `T` itself need not be `Clone`/`Copy`.
impl<T> Clone for ItemRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ItemRef<'_, T> {}

impl<'a, T: ListItem> ItemRef<'a, T> {
    #[must_use]
    pub fn remote_id(&self) -> RemoteId {
        match self {
            Self::Loading(id) => *id,
            Self::Ready(item) => item.remote_id(),
        }
    }

    #[must_use]
    pub const fn value(&self) -> Option<&'a T> {
        match self {
            Self::Loading(_) => None,
            Self::Ready(item) => Some(item),
        }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }

    /// Content equality for diffing: two placeholders are equal, a
    /// placeholder never equals a resolved item.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Loading(_), Self::Loading(_)) => true,
            (Self::Ready(a), Self::Ready(b)) => a.same_content(b),
            (Self::Loading(_), Self::Ready(_)) | (Self::Ready(_), Self::Loading(_)) => false,
        }
    }
}

pub struct ListManager<D: ListDescriptor, T: ListItem> {
    store: Arc<ListStore>,
    source: Arc<dyn ListItemDataSource<D, T>>,
    descriptor: D,
    identity: ListIdentity,
    record: ListRecord,
    remote_ids: Vec<RemoteId>,
    items: HashMap<RemoteId, T>,
    load_more_offset: usize,
}

impl<D: ListDescriptor, T: ListItem> ListManager<D, T> {
    /// Build a snapshot from the store.
    ///
    /// Creates the record on first access. Every distinct id the local
    /// lookup cannot resolve triggers exactly one `fetch_item`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record or index cannot be read.
    pub fn load(
        store: Arc<ListStore>,
        descriptor: D,
        source: Arc<dyn ListItemDataSource<D, T>>,
    ) -> Result<Self, StoreError> {
        let identity = descriptor.identity();
        let (record, entries) = store.read_list(identity)?;

        let markers = entries
            .iter()
            .filter(|entry| matches!(entry, IndexEntry::Marker(_)))
            .count();
        if markers > 0 {
            debug!(list_id = %identity.id, markers, "marker rows are not materialized");
        }
        let remote_ids: Vec<RemoteId> = entries.into_iter().filter_map(IndexEntry::remote_id).collect();

        let mut seen = HashSet::with_capacity(remote_ids.len());
        let distinct: Vec<RemoteId> = remote_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let mut items = if distinct.is_empty() {
            HashMap::new()
        } else {
            source.get_items(&descriptor, &distinct)
        };
        items.retain(|id, _| seen.contains(id));

        let mut pending = 0_usize;
        for id in &distinct {
            if !items.contains_key(id) {
                source.fetch_item(&descriptor, *id);
                pending += 1;
            }
        }

        debug!(
            list_id = %identity.id,
            size = remote_ids.len(),
            resolved = items.len(),
            pending,
            state = %record.state,
            "built list snapshot"
        );

        Ok(Self {
            load_more_offset: store.config().load_more_offset,
            store,
            source,
            descriptor,
            identity,
            record,
            remote_ids,
            items,
        })
    }

    #[must_use]
    pub const fn descriptor(&self) -> &D {
        &self.descriptor
    }

    #[must_use]
    pub const fn identity(&self) -> ListIdentity {
        self.identity
    }

    /// Record as it was when this snapshot was built.
    #[must_use]
    pub const fn record(&self) -> &ListRecord {
        &self.record
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.remote_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remote_ids.is_empty()
    }

    #[must_use]
    pub const fn is_fetching_first_page(&self) -> bool {
        self.record.is_fetching_first_page()
    }

    #[must_use]
    pub const fn is_loading_more(&self) -> bool {
        self.record.is_loading_more()
    }

    #[must_use]
    pub const fn can_load_more(&self) -> bool {
        self.record.can_load_more
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.record.is_error()
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.record.error_message()
    }

    #[must_use]
    pub fn remote_id_at(&self, position: usize) -> Option<RemoteId> {
        self.remote_ids.get(position).copied()
    }

    /// Item or placeholder at `position`.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<ItemRef<'_, T>> {
        let id = self.remote_ids.get(position)?;
        Some(
            self.items
                .get(id)
                .map_or(ItemRef::Loading(*id), ItemRef::Ready),
        )
    }

    /// Like [`Self::get`], optionally asking for the next page when
    /// `position` is close to the end of the list.
    pub fn get_item(&self, position: usize, load_more_if_necessary: bool) -> Option<ItemRef<'_, T>> {
        if load_more_if_necessary && position + self.load_more_offset >= self.size() {
            if let Err(err) = self.load_more() {
                warn!(list_id = %self.identity.id, "load more failed: {err}");
            }
        }
        self.get(position)
    }

    /// All positions in order.
    pub fn iter(&self) -> impl Iterator<Item = ItemRef<'_, T>> + '_ {
        (0..self.size()).filter_map(|position| self.get(position))
    }

    #[must_use]
    pub fn position_of(&self, remote_id: RemoteId) -> Option<usize> {
        self.remote_ids.iter().position(|id| *id == remote_id)
    }

    /// Request the first page. See [`ListStore::refresh`].
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be updated.
    pub fn refresh(&self) -> Result<bool, StoreError> {
        self.store.refresh(&self.descriptor, self.source.as_ref())
    }

    /// Request the next page. See [`ListStore::load_more`].
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be updated.
    pub fn load_more(&self) -> Result<bool, StoreError> {
        self.store.load_more(&self.descriptor, self.source.as_ref())
    }

    /// Identity match between a position here and one in `other`.
    #[must_use]
    pub fn same_identity_at(&self, position: usize, other: &Self, other_position: usize) -> bool {
        match (self.remote_id_at(position), other.remote_id_at(other_position)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Content match between a position here and one in `other`.
    #[must_use]
    pub fn same_content_at(&self, position: usize, other: &Self, other_position: usize) -> bool {
        match (self.get(position), other.get(other_position)) {
            (Some(a), Some(b)) => a.same_content(&b),
            _ => false,
        }
    }
}

impl<D: ListDescriptor, T: ListItem> std::fmt::Debug for ListManager<D, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListManager")
            .field("identity", &self.identity)
            .field("state", &self.record.state)
            .field("size", &self.remote_ids.len())
            .field("resolved", &self.items.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::descriptor::OrderListDescriptor;
    use crate::store::FetchedPage;
    use crate::testing::{shared, Call, FakeSource, Order};

    fn ids(raw: &[i64]) -> Vec<RemoteId> {
        raw.iter().copied().map(RemoteId).collect()
    }

    fn seeded(
        raw: &[i64],
    ) -> (Arc<ListStore>, Arc<FakeSource<Order>>, OrderListDescriptor) {
        let store = ListStore::in_memory(EngineConfig::default()).expect("store");
        let source = Arc::new(FakeSource::<Order>::new());
        let descriptor = OrderListDescriptor::new(1);
        store.refresh(&descriptor, source.as_ref()).expect("refresh");
        store
            .on_list_fetched(&descriptor, FetchedPage::new(0, ids(raw), true))
            .expect("page");
        source.clear_calls();
        (store, source, descriptor)
    }

    #[test]
    fn empty_lookup_renders_every_position_as_loading() -> Result<(), StoreError> {
        let (store, source, descriptor) = seeded(&[1, 2, 3]);
        let manager = store.list_manager(descriptor, shared(&source))?;

        assert_eq!(manager.size(), 3);
        assert!(manager.iter().all(|item| item.is_loading()));
        assert_eq!(
            source.calls(),
            vec![Call::FetchItem(RemoteId(1)), Call::FetchItem(RemoteId(2)), Call::FetchItem(RemoteId(3))]
        );
        Ok(())
    }

    #[test]
    fn duplicate_pending_ids_are_fetched_once_per_load() -> Result<(), StoreError> {
        let (store, source, descriptor) = seeded(&[]);
        // Duplicates can only reach the index through the repository itself.
        {
            let mut repo = store.repo()?;
            repo.append_index_entries(
                descriptor.list_id(),
                &[IndexEntry::Remote(RemoteId(4)), IndexEntry::Remote(RemoteId(4))],
            )?;
        }

        let manager = store.list_manager(descriptor.clone(), shared(&source))?;
        assert_eq!(manager.size(), 2);
        assert_eq!(source.calls(), vec![Call::FetchItem(RemoteId(4))]);

        let _again = store.list_manager(descriptor, shared(&source))?;
        assert_eq!(source.calls().len(), 2);
        Ok(())
    }

    #[test]
    fn resolved_items_replace_placeholders() -> Result<(), StoreError> {
        let (store, source, descriptor) = seeded(&[1, 2]);
        source.put(Order::new(2, "Ada Lovelace", "processing"));

        let manager = store.list_manager(descriptor, shared(&source))?;
        assert!(manager.get(0).is_some_and(|item| item.is_loading()));
        let ready = manager.get(1).and_then(|item| item.value()).expect("resolved");
        assert_eq!(ready.customer_name, "Ada Lovelace");
        assert!(manager.get(2).is_none());
        assert_eq!(source.calls(), vec![Call::FetchItem(RemoteId(1))]);
        Ok(())
    }

    #[test]
    fn snapshot_flags_are_copied_at_build_time() -> Result<(), StoreError> {
        let (store, source, descriptor) = seeded(&[1]);
        let before = store.list_manager(descriptor.clone(), shared(&source))?;
        assert!(!before.is_loading_more());
        assert!(before.can_load_more());

        assert!(before.load_more()?);
        assert!(!before.is_loading_more());

        let after = store.list_manager(descriptor, shared(&source))?;
        assert!(after.is_loading_more());
        Ok(())
    }

    #[test]
    fn get_item_near_end_triggers_load_more() -> Result<(), StoreError> {
        let (store, source, descriptor) = seeded(&(0..30).collect::<Vec<_>>());
        source.put_all((0..30).map(|id| Order::new(id, "x", "pending")));
        let manager = store.list_manager(descriptor, shared(&source))?;

        let _ = manager.get_item(5, true);
        assert!(source.calls().is_empty());

        let _ = manager.get_item(20, false);
        assert!(source.calls().is_empty());

        let _ = manager.get_item(20, true);
        assert_eq!(source.calls(), vec![Call::FetchList(30)]);
        Ok(())
    }

    #[test]
    fn fresh_descriptor_yields_empty_snapshot() -> Result<(), StoreError> {
        let store = ListStore::in_memory(EngineConfig::default()).expect("store");
        let source: Arc<FakeSource<Order>> = Arc::new(FakeSource::new());
        let manager = store.list_manager(OrderListDescriptor::new(9), shared(&source))?;
        assert!(manager.is_empty());
        assert!(!manager.is_fetching_first_page());
        assert!(source.calls().is_empty());
        Ok(())
    }
}
