//! In-crate fakes shared by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::descriptor::ListDescriptor;
use crate::model::RemoteId;
use crate::source::{ListItem, ListItemDataSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub remote_id: RemoteId,
    pub customer_name: String,
    pub status: String,
}

impl Order {
    pub fn new(id: i64, customer_name: &str, status: &str) -> Self {
        Self {
            remote_id: RemoteId(id),
            customer_name: customer_name.to_string(),
            status: status.to_string(),
        }
    }
}

impl ListItem for Order {
    fn remote_id(&self) -> RemoteId {
        self.remote_id
    }

    fn same_content(&self, other: &Self) -> bool {
        self.customer_name == other.customer_name && self.status == other.status
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    FetchList(usize),
    FetchItem(RemoteId),
}

/// Records requests; resolves lookups from an in-memory map.
#[derive(Debug)]
pub struct FakeSource<T> {
    items: Mutex<HashMap<RemoteId, T>>,
    calls: Mutex<Vec<Call>>,
}

impl<T: ListItem> FakeSource<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn put(&self, item: T) {
        self.items.lock().expect("lock").insert(item.remote_id(), item);
    }

    pub fn put_all(&self, items: impl IntoIterator<Item = T>) {
        let mut map = self.items.lock().expect("lock");
        for item in items {
            map.insert(item.remote_id(), item);
        }
    }

    pub fn forget(&self, id: RemoteId) {
        self.items.lock().expect("lock").remove(&id);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().expect("lock").clear();
    }
}

impl<D: ListDescriptor, T: ListItem> ListItemDataSource<D, T> for FakeSource<T> {
    fn fetch_item(&self, _descriptor: &D, remote_id: RemoteId) {
        self.calls.lock().expect("lock").push(Call::FetchItem(remote_id));
    }

    fn fetch_list(&self, _descriptor: &D, offset: usize) {
        self.calls.lock().expect("lock").push(Call::FetchList(offset));
    }

    fn get_items(&self, _descriptor: &D, remote_ids: &[RemoteId]) -> HashMap<RemoteId, T> {
        let items = self.items.lock().expect("lock");
        remote_ids
            .iter()
            .filter_map(|id| items.get(id).map(|item| (*id, item.clone())))
            .collect()
    }
}

/// Type-erase a fake for APIs taking `Arc<dyn ListItemDataSource>`.
pub fn shared<D: ListDescriptor, T: ListItem>(
    source: &Arc<FakeSource<T>>,
) -> Arc<dyn ListItemDataSource<D, T>> {
    Arc::clone(source) as Arc<dyn ListItemDataSource<D, T>>
}
