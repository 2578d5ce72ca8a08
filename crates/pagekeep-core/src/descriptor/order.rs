//! Descriptor for store order lists.

use super::{CanonicalKey, DEFAULT_PAGE_SIZE, ListDescriptor};

/// Orders of one store, optionally filtered by status.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderListDescriptor {
    pub site_id: i64,
    pub status_filter: Option<String>,
    pub page_size: usize,
}

impl OrderListDescriptor {
    #[must_use]
    pub const fn new(site_id: i64) -> Self {
        Self {
            site_id,
            status_filter: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status_filter = Some(status.into());
        self
    }

    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Family key shared by every order list of a store.
    #[must_use]
    pub fn type_key_for_site(site_id: i64) -> String {
        CanonicalKey::new("site-order-list")
            .field("site", site_id)
            .finish()
    }
}

impl ListDescriptor for OrderListDescriptor {
    fn unique_key(&self) -> String {
        CanonicalKey::new("order-list")
            .field("site", self.site_id)
            .opt_field("status", self.status_filter.as_deref())
            .finish()
    }

    fn type_key(&self) -> String {
        Self::type_key_for_site(self.site_id)
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PostListDescriptor;

    #[test]
    fn status_filter_changes_list_id_only() {
        let all = OrderListDescriptor::new(4);
        let processing = OrderListDescriptor::new(4).with_status("processing");
        assert_ne!(all.list_id(), processing.list_id());
        assert_eq!(all.type_id(), processing.type_id());
    }

    #[test]
    fn order_and_post_families_are_distinct() {
        assert_ne!(
            OrderListDescriptor::new(4).type_id(),
            PostListDescriptor::rest(4).type_id()
        );
    }
}
