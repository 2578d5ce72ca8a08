//! Remote/data-source fakes shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pagekeep_core::{FetchedPage, ListDescriptor, ListItem, ListItemDataSource, ListStore, RemoteId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: RemoteId,
    pub name: String,
    pub status: String,
}

impl Product {
    pub fn new(id: i64, name: &str, status: &str) -> Self {
        Self {
            id: RemoteId(id),
            name: name.to_string(),
            status: status.to_string(),
        }
    }
}

impl ListItem for Product {
    fn remote_id(&self) -> RemoteId {
        self.id
    }

    fn same_content(&self, other: &Self) -> bool {
        self.name == other.name && self.status == other.status
    }
}

/// A remote collection served page by page, plus a local item cache.
///
/// Requests are queued like real network calls and only answered when the
/// test calls [`RemoteFake::deliver_pages`].
#[derive(Debug)]
pub struct RemoteFake {
    page_size: usize,
    remote: Mutex<Vec<RemoteId>>,
    cache: Mutex<HashMap<RemoteId, Product>>,
    page_requests: Mutex<Vec<usize>>,
    item_requests: Mutex<Vec<RemoteId>>,
}

impl RemoteFake {
    pub fn new(remote: &[i64], page_size: usize) -> Arc<Self> {
        Arc::new(Self {
            page_size,
            remote: Mutex::new(remote.iter().copied().map(RemoteId).collect()),
            cache: Mutex::new(HashMap::new()),
            page_requests: Mutex::new(Vec::new()),
            item_requests: Mutex::new(Vec::new()),
        })
    }

    pub fn set_remote(&self, remote: &[i64]) {
        *self.remote.lock().unwrap() = remote.iter().copied().map(RemoteId).collect();
    }

    pub fn cache(&self, product: Product) {
        self.cache.lock().unwrap().insert(product.id, product);
    }

    pub fn page_requests(&self) -> Vec<usize> {
        self.page_requests.lock().unwrap().clone()
    }

    pub fn item_requests(&self) -> Vec<RemoteId> {
        self.item_requests.lock().unwrap().clone()
    }

    /// Answer every queued page request. Returns how many were applied.
    pub fn deliver_pages<D: ListDescriptor>(&self, store: &ListStore, descriptor: &D) -> usize {
        let requests: Vec<usize> = self.page_requests.lock().unwrap().drain(..).collect();
        let remote = self.remote.lock().unwrap().clone();
        requests
            .into_iter()
            .filter(|offset| {
                let end = (offset + self.page_size).min(remote.len());
                let ids = remote.get(*offset..end).unwrap_or_default().to_vec();
                let page = FetchedPage::new(*offset, ids, end < remote.len());
                store.on_list_fetched(descriptor, page).unwrap()
            })
            .count()
    }

    /// Fail every queued page request.
    pub fn fail_pages<D: ListDescriptor>(&self, store: &ListStore, descriptor: &D, message: &str) {
        let requests: Vec<usize> = self.page_requests.lock().unwrap().drain(..).collect();
        for _ in requests {
            store.on_list_fetch_failed(descriptor, message).unwrap();
        }
    }
}

impl<D: ListDescriptor> ListItemDataSource<D, Product> for RemoteFake {
    fn fetch_item(&self, _descriptor: &D, remote_id: RemoteId) {
        self.item_requests.lock().unwrap().push(remote_id);
    }

    fn fetch_list(&self, _descriptor: &D, offset: usize) {
        self.page_requests.lock().unwrap().push(offset);
    }

    fn get_items(&self, _descriptor: &D, remote_ids: &[RemoteId]) -> HashMap<RemoteId, Product> {
        let cache = self.cache.lock().unwrap();
        remote_ids
            .iter()
            .filter_map(|id| cache.get(id).map(|product| (*id, product.clone())))
            .collect()
    }
}

/// Type-erased handle for the snapshot APIs.
pub fn erased<D: ListDescriptor>(
    fake: &Arc<RemoteFake>,
) -> Arc<dyn ListItemDataSource<D, Product>> {
    Arc::clone(fake) as Arc<dyn ListItemDataSource<D, Product>>
}
