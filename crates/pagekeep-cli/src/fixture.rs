//! A fixture-backed stand-in for the remote order service.
//!
//! Remote data comes from a JSON file of orders. Resolved orders are kept in
//! a local JSON cache next to the database, which plays the role of the
//! caller's item store. `fetch_list` and `fetch_item` only queue requests;
//! [`FixtureSource::drain`] answers them and reports back to the store the
//! way a network callback would.

use anyhow::{Context, Result};
use pagekeep_core::descriptor::OrderListDescriptor;
use pagekeep_core::{FetchedPage, ListDescriptor, ListItem, ListItemDataSource, ListStore, RemoteId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer: String,
    pub status: String,
}

impl ListItem for Order {
    fn remote_id(&self) -> RemoteId {
        RemoteId(self.id)
    }

    fn same_content(&self, other: &Self) -> bool {
        self.customer == other.customer && self.status == other.status
    }
}

#[derive(Debug, Clone)]
enum Request {
    Page {
        descriptor: OrderListDescriptor,
        offset: usize,
    },
    Item {
        type_id: pagekeep_core::ListTypeId,
        id: RemoteId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageOutcome {
    Applied,
    /// The store no longer wanted the page.
    Stale,
    Failed,
}

/// What one [`FixtureSource::drain`] pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub pages_applied: usize,
    pub pages_stale: usize,
    pub pages_failed: usize,
    pub items_resolved: usize,
    pub items_missing: usize,
}

impl DrainReport {
    /// Whether anything changed that a rebuilt snapshot would show.
    /// Stale pages leave the store untouched and do not count.
    pub const fn progressed(&self) -> bool {
        self.pages_applied > 0 || self.pages_failed > 0 || self.items_resolved > 0
    }

    /// Fold another pass into this one.
    pub const fn absorb(&mut self, other: &Self) {
        self.pages_applied += other.pages_applied;
        self.pages_stale += other.pages_stale;
        self.pages_failed += other.pages_failed;
        self.items_resolved += other.items_resolved;
        self.items_missing += other.items_missing;
    }
}

#[derive(Debug)]
pub struct FixtureSource {
    remote: Option<Vec<Order>>,
    cache_path: PathBuf,
    cache: Mutex<BTreeMap<i64, Order>>,
    requests: Mutex<VecDeque<Request>>,
}

impl FixtureSource {
    /// Load the remote fixture (if any) and the local item cache.
    ///
    /// # Errors
    ///
    /// Returns an error if either file exists but cannot be read or parsed.
    pub fn load(fixture: Option<&Path>, cache_path: PathBuf) -> Result<Self> {
        let remote = fixture.map(read_orders).transpose()?;
        let cache = if cache_path.exists() {
            read_orders(&cache_path)?
                .into_iter()
                .map(|order| (order.id, order))
                .collect()
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            remote,
            cache_path,
            cache: Mutex::new(cache),
            requests: Mutex::new(VecDeque::new()),
        })
    }

    pub fn pending_requests(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drop every cached order.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache file cannot be written.
    pub fn clear_cache(&self) -> Result<usize> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let removed = cache.len();
        cache.clear();
        write_orders(&self.cache_path, cache.values())?;
        Ok(removed)
    }

    /// Answer every queued request, including ones queued while answering.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or the cache file cannot be updated.
    pub fn drain(&self, store: &ListStore) -> Result<DrainReport> {
        let mut report = DrainReport::default();
        let mut changed_families = Vec::new();

        while let Some(request) = self.next_request() {
            match request {
                Request::Page { descriptor, offset } => {
                    match self.answer_page(store, &descriptor, offset)? {
                        PageOutcome::Applied => report.pages_applied += 1,
                        PageOutcome::Stale => report.pages_stale += 1,
                        PageOutcome::Failed => report.pages_failed += 1,
                    }
                }
                Request::Item { type_id, id } => {
                    if self.resolve_item(id) {
                        report.items_resolved += 1;
                        if !changed_families.contains(&type_id) {
                            changed_families.push(type_id);
                        }
                    } else {
                        report.items_missing += 1;
                    }
                }
            }
        }

        if report.items_resolved > 0 {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            write_orders(&self.cache_path, cache.values())?;
        }
        for type_id in changed_families {
            store.notify_items_changed(type_id);
        }
        debug!(?report, "drained fixture requests");
        Ok(report)
    }

    fn next_request(&self) -> Option<Request> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn answer_page(
        &self,
        store: &ListStore,
        descriptor: &OrderListDescriptor,
        offset: usize,
    ) -> Result<PageOutcome> {
        let Some(remote) = &self.remote else {
            store.on_list_fetch_failed(descriptor, "no fixture configured; pass --fixture")?;
            return Ok(PageOutcome::Failed);
        };

        let matching: Vec<RemoteId> = remote
            .iter()
            .filter(|order| {
                descriptor
                    .status_filter
                    .as_deref()
                    .is_none_or(|status| order.status.eq_ignore_ascii_case(status))
            })
            .map(ListItem::remote_id)
            .collect();
        let end = offset.saturating_add(descriptor.page_size()).min(matching.len());
        let ids = matching.get(offset..end).unwrap_or_default().to_vec();
        let page = FetchedPage::new(offset, ids, end < matching.len());
        if store.on_list_fetched(descriptor, page)? {
            Ok(PageOutcome::Applied)
        } else {
            debug!(offset, "fixture page was stale");
            Ok(PageOutcome::Stale)
        }
    }

    fn resolve_item(&self, id: RemoteId) -> bool {
        let found = self
            .remote
            .as_ref()
            .and_then(|remote| remote.iter().find(|order| order.remote_id() == id));
        match found {
            Some(order) => {
                self.cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(order.id, order.clone());
                true
            }
            None => {
                warn!(remote_id = id.0, "order not found in fixture; stays pending");
                false
            }
        }
    }
}

impl ListItemDataSource<OrderListDescriptor, Order> for FixtureSource {
    fn fetch_item(&self, descriptor: &OrderListDescriptor, remote_id: RemoteId) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Request::Item {
                type_id: descriptor.type_id(),
                id: remote_id,
            });
    }

    fn fetch_list(&self, descriptor: &OrderListDescriptor, offset: usize) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Request::Page {
                descriptor: descriptor.clone(),
                offset,
            });
    }

    fn get_items(
        &self,
        _descriptor: &OrderListDescriptor,
        remote_ids: &[RemoteId],
    ) -> HashMap<RemoteId, Order> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        remote_ids
            .iter()
            .filter_map(|id| cache.get(&id.0).map(|order| (*id, order.clone())))
            .collect()
    }
}

fn read_orders(path: &Path) -> Result<Vec<Order>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_orders<'a>(path: &Path, orders: impl Iterator<Item = &'a Order>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let orders: Vec<&Order> = orders.collect();
    let json = serde_json::to_string_pretty(&orders)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
