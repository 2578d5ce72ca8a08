pub mod clear;
pub mod more;
pub mod prune;
pub mod refresh;
pub mod show;

use pagekeep_core::{DiffResult, Edit, Entry, ItemRef, ListRecord};
use serde::Serialize;
use std::io::{self, Write};

use crate::fixture::Order;
use crate::output::kv;

/// One printed row of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowView {
    Section {
        title: String,
    },
    Item {
        id: i64,
        customer: String,
        status: String,
    },
    Loading {
        id: i64,
    },
}

impl RowView {
    pub fn from_item(item: ItemRef<'_, Order>) -> Self {
        match item {
            ItemRef::Ready(order) => Self::Item {
                id: order.id,
                customer: order.customer.clone(),
                status: order.status.clone(),
            },
            ItemRef::Loading(id) => Self::Loading { id: id.0 },
        }
    }

    pub fn from_entry(entry: Entry<'_, Order>) -> Self {
        match entry {
            Entry::Section(marker) => Self::Section {
                title: marker.title.clone(),
            },
            Entry::Item(item) => Self::from_item(item),
        }
    }

    pub fn write(&self, w: &mut dyn Write, position: usize) -> io::Result<()> {
        match self {
            Self::Section { title } => writeln!(w, "== {title}"),
            Self::Item {
                id,
                customer,
                status,
            } => writeln!(w, "{position:>4}  #{id:<8} {customer:<24} {status}"),
            Self::Loading { id } => writeln!(w, "{position:>4}  #{id:<8} (loading)"),
        }
    }
}

/// Record fields shared by command payloads.
#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    pub list_id: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub can_load_more: bool,
}

impl From<&ListRecord> for RecordView {
    fn from(record: &ListRecord) -> Self {
        Self {
            list_id: record.id.to_string(),
            state: record.state.as_str().to_string(),
            error: record.error_message().map(str::to_string),
            can_load_more: record.can_load_more,
        }
    }
}

impl RecordView {
    pub fn write(&self, w: &mut dyn Write) -> io::Result<()> {
        kv(w, "list", &self.list_id)?;
        kv(w, "state", &self.state)?;
        if let Some(error) = &self.error {
            kv(w, "error", error)?;
        }
        kv(w, "more pages", if self.can_load_more { "yes" } else { "no" })
    }
}

/// Human summary of a diff: counts, then one line per edit.
pub fn write_diff(w: &mut dyn Write, diff: &DiffResult) -> io::Result<()> {
    let stats = diff.stats();
    kv(
        w,
        "changes",
        format!(
            "+{} -{} ~{} moved {}",
            stats.inserted, stats.removed, stats.changed, stats.moved
        ),
    )?;
    for edit in diff.edits() {
        match *edit {
            Edit::Remove { position, count } => writeln!(w, "  remove {count} at {position}")?,
            Edit::Insert { position, count } => writeln!(w, "  insert {count} at {position}")?,
            Edit::Move { from, to } => writeln!(w, "  move {from} -> {to}")?,
            Edit::Change { position, count } => writeln!(w, "  change {count} at {position}")?,
        }
    }
    Ok(())
}
