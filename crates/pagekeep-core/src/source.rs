//! Contracts implemented by callers: items and the data source behind them.

use std::collections::HashMap;

use crate::descriptor::ListDescriptor;
use crate::model::RemoteId;

/// A resolved item as held by the caller's local item store.
pub trait ListItem: Clone + Send + Sync + 'static {
    /// Identity used for list membership and diff matching.
    fn remote_id(&self) -> RemoteId;

    /// Whether the rendering-relevant fields of two identity-equal items
    /// are equal. Only consulted after identities matched.
    fn same_content(&self, other: &Self) -> bool;
}

/// Remote fetches and local lookups for one item type.
///
/// `fetch_item` and `fetch_list` are fire-and-forget: results are delivered
/// later through [`crate::store::ListStore::on_list_fetched`],
/// [`crate::store::ListStore::on_list_fetch_failed`], or
/// [`crate::store::ListStore::notify_items_changed`].
pub trait ListItemDataSource<D: ListDescriptor, T: ListItem>: Send + Sync {
    /// Request remote resolution of one item missing from the local store.
    fn fetch_item(&self, descriptor: &D, remote_id: RemoteId);

    /// Request the page of remote ids starting at `offset`.
    fn fetch_list(&self, descriptor: &D, offset: usize);

    /// Look up locally cached items. Ids absent from the result are not yet
    /// cached and render as loading placeholders.
    fn get_items(&self, descriptor: &D, remote_ids: &[RemoteId]) -> HashMap<RemoteId, T>;
}
