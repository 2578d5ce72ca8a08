//! Presentational grouping of a list snapshot into sections.
//!
//! Sections are never persisted. A [`GroupingPolicy`] is applied to the
//! resolved sequence every time a snapshot is built, so it must be
//! deterministic for diffs between snapshots to be meaningful.

use crate::descriptor::{ListDescriptor, ListIdentity};
use crate::error::StoreError;
use crate::manager::{ItemRef, ListManager};
use crate::model::ListRecord;
use crate::source::ListItem;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionMarker {
    pub title: String,
}

impl SectionMarker {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// One row produced by a grouping policy: a marker or an index into the
/// underlying list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Section(SectionMarker),
    Item(usize),
}

/// A materialized row of a sectioned snapshot.
#[derive(Debug)]
pub enum Entry<'a, T> {
    Section(&'a SectionMarker),
    Item(ItemRef<'a, T>),
}

impl<T> Clone for Entry<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Entry<'_, T> {}

impl<'a, T: ListItem> Entry<'a, T> {
    #[must_use]
    pub const fn is_section(&self) -> bool {
        matches!(self, Self::Section(_))
    }

    #[must_use]
    pub const fn item(&self) -> Option<ItemRef<'a, T>> {
        match self {
            Self::Section(_) => None,
            Self::Item(item) => Some(*item),
        }
    }

    /// Markers match on title, items on remote id, never across kinds.
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Section(a), Self::Section(b)) => a.title == b.title,
            (Self::Item(a), Self::Item(b)) => a.remote_id() == b.remote_id(),
            (Self::Section(_), Self::Item(_)) | (Self::Item(_), Self::Section(_)) => false,
        }
    }

    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Section(a), Self::Section(b)) => a == b,
            (Self::Item(a), Self::Item(b)) => a.same_content(b),
            (Self::Section(_), Self::Item(_)) | (Self::Item(_), Self::Section(_)) => false,
        }
    }
}

/// Turns a resolved sequence into rows. Every `Row::Item` must index into
/// `items`; out-of-range rows are dropped.
pub trait GroupingPolicy<T>: Send + Sync {
    fn group(&self, items: &[ItemRef<'_, T>]) -> Vec<Row>;
}

impl<T, F> GroupingPolicy<T> for F
where
    F: Fn(&[ItemRef<'_, T>]) -> Vec<Row> + Send + Sync,
{
    fn group(&self, items: &[ItemRef<'_, T>]) -> Vec<Row> {
        self(items)
    }
}

/// Fixed-size runs, each preceded by a "Section N" marker (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedSections {
    pub chunk_size: usize,
}

impl ChunkedSections {
    pub const DEFAULT_CHUNK_SIZE: usize = 10;

    /// A chunk size of zero is treated as one.
    #[must_use]
    pub const fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: if chunk_size == 0 { 1 } else { chunk_size },
        }
    }
}

impl Default for ChunkedSections {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHUNK_SIZE)
    }
}

impl<T> GroupingPolicy<T> for ChunkedSections {
    fn group(&self, items: &[ItemRef<'_, T>]) -> Vec<Row> {
        let chunk = self.chunk_size.max(1);
        let mut rows = Vec::with_capacity(items.len() + items.len().div_ceil(chunk));
        for index in 0..items.len() {
            if index % chunk == 0 {
                rows.push(Row::Section(SectionMarker::new(format!(
                    "Section {}",
                    index / chunk + 1
                ))));
            }
            rows.push(Row::Item(index));
        }
        rows
    }
}

/// A [`ListManager`] snapshot with grouping rows applied.
pub struct SectionedListManager<D: ListDescriptor, T: ListItem> {
    manager: ListManager<D, T>,
    rows: Vec<Row>,
}

impl<D: ListDescriptor, T: ListItem> SectionedListManager<D, T> {
    #[must_use]
    pub fn new(manager: ListManager<D, T>, policy: &dyn GroupingPolicy<T>) -> Self {
        let items: Vec<ItemRef<'_, T>> = manager.iter().collect();
        let mut rows = policy.group(&items);
        let size = items.len();
        rows.retain(|row| match row {
            Row::Item(index) => *index < size,
            Row::Section(_) => true,
        });
        drop(items);
        Self { manager, rows }
    }

    #[must_use]
    pub const fn manager(&self) -> &ListManager<D, T> {
        &self.manager
    }

    #[must_use]
    pub fn into_manager(self) -> ListManager<D, T> {
        self.manager
    }

    #[must_use]
    pub const fn identity(&self) -> ListIdentity {
        self.manager.identity()
    }

    #[must_use]
    pub const fn record(&self) -> &ListRecord {
        self.manager.record()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn is_section(&self, position: usize) -> bool {
        matches!(self.rows.get(position), Some(Row::Section(_)))
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<Entry<'_, T>> {
        match self.rows.get(position)? {
            Row::Section(marker) => Some(Entry::Section(marker)),
            Row::Item(index) => self.manager.get(*index).map(Entry::Item),
        }
    }

    /// Like [`Self::get`]; item rows may trigger a page load near the end.
    pub fn get_item(&self, position: usize, load_more_if_necessary: bool) -> Option<Entry<'_, T>> {
        match self.rows.get(position)? {
            Row::Section(marker) => Some(Entry::Section(marker)),
            Row::Item(index) => self
                .manager
                .get_item(*index, load_more_if_necessary)
                .map(Entry::Item),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Entry<'_, T>> + '_ {
        (0..self.size()).filter_map(|position| self.get(position))
    }

    #[must_use]
    pub const fn is_fetching_first_page(&self) -> bool {
        self.manager.is_fetching_first_page()
    }

    #[must_use]
    pub const fn is_loading_more(&self) -> bool {
        self.manager.is_loading_more()
    }

    #[must_use]
    pub const fn can_load_more(&self) -> bool {
        self.manager.can_load_more()
    }

    /// # Errors
    ///
    /// Returns an error if the record cannot be updated.
    pub fn refresh(&self) -> Result<bool, StoreError> {
        self.manager.refresh()
    }

    /// # Errors
    ///
    /// Returns an error if the record cannot be updated.
    pub fn load_more(&self) -> Result<bool, StoreError> {
        self.manager.load_more()
    }

    /// Identity equality of two rows, possibly from different snapshots.
    #[must_use]
    pub fn are_items_the_same(a: &Self, b: &Self, position_a: usize, position_b: usize) -> bool {
        match (a.get(position_a), b.get(position_b)) {
            (Some(x), Some(y)) => x.same_identity(&y),
            _ => false,
        }
    }
}

impl<D: ListDescriptor, T: ListItem> std::fmt::Debug for SectionedListManager<D, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionedListManager")
            .field("manager", &self.manager)
            .field("rows", &self.rows.len())
            .finish()
    }
}
