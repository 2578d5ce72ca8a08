//! Persisted list metadata and ordered index entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::descriptor::{ListId, ListIdentity, ListTypeId};

/// Identifier of an item on the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteId(pub i64);

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fetch lifecycle of one list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ListState {
    /// Never fetched in this process, or a fetch was interrupted by a restart.
    #[default]
    NeedsRefresh,
    Fetched,
    FetchingFirstPage,
    LoadingMore,
    Error { message: String },
}

impl ListState {
    /// Column value stored in `lists.state`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NeedsRefresh => "needs_refresh",
            Self::Fetched => "fetched",
            Self::FetchingFirstPage => "fetching_first_page",
            Self::LoadingMore => "loading_more",
            Self::Error { .. } => "error",
        }
    }

    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::FetchingFirstPage | Self::LoadingMore)
    }
}

impl fmt::Display for ListState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for state strings this build does not recognise.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown list state '{0}'")]
pub struct UnknownListState(pub String);

impl FromStr for ListState {
    type Err = UnknownListState;

    /// Parses the bare state; an `error` row gets its message attached by
    /// the repository.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "needs_refresh" => Ok(Self::NeedsRefresh),
            "fetched" => Ok(Self::Fetched),
            "fetching_first_page" => Ok(Self::FetchingFirstPage),
            "loading_more" => Ok(Self::LoadingMore),
            "error" => Ok(Self::Error {
                message: String::new(),
            }),
            other => Err(UnknownListState(other.to_string())),
        }
    }
}

/// Durable metadata for one list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRecord {
    pub id: ListId,
    pub type_id: ListTypeId,
    pub state: ListState,
    /// Whether the data source reported more remote pages after the last one.
    pub can_load_more: bool,
    /// Offset of the last page requested from the data source.
    pub last_fetched_offset: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl ListRecord {
    /// Fresh, never-fetched record.
    #[must_use]
    pub fn new(identity: ListIdentity, now: DateTime<Utc>) -> Self {
        Self {
            id: identity.id,
            type_id: identity.type_id,
            state: ListState::NeedsRefresh,
            can_load_more: false,
            last_fetched_offset: None,
            created_at: now,
            last_modified: now,
        }
    }

    #[must_use]
    pub const fn is_fetching_first_page(&self) -> bool {
        matches!(self.state, ListState::FetchingFirstPage)
    }

    #[must_use]
    pub const fn is_loading_more(&self) -> bool {
        matches!(self.state, ListState::LoadingMore)
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.state, ListState::Error { .. })
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            ListState::Error { message } => Some(message),
            _ => None,
        }
    }

    /// At least one page has completed (successfully or not) since creation.
    #[must_use]
    pub const fn has_fetched(&self) -> bool {
        self.last_fetched_offset.is_some() && !self.is_fetching_first_page()
    }
}

/// One row of the ordered item index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexEntry {
    Remote(RemoteId),
    Marker(i64),
}

impl IndexEntry {
    #[must_use]
    pub const fn remote_id(self) -> Option<RemoteId> {
        match self {
            Self::Remote(id) => Some(id),
            Self::Marker(_) => None,
        }
    }
}
