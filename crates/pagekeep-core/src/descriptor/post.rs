//! Descriptors for post lists.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{CanonicalKey, DEFAULT_PAGE_SIZE, ListDescriptor};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ListOrder {
    Asc,
    #[default]
    Desc,
}

impl ListOrder {
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for ListOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// Error for sort directions other than `asc` and `desc`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown list order '{0}': expected asc or desc")]
pub struct UnknownListOrder(pub String);

impl FromStr for ListOrder {
    type Err = UnknownListOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(UnknownListOrder(other.to_string())),
        }
    }
}

/// Field a post list is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PostListOrderBy {
    #[default]
    Date,
    LastModified,
    Title,
    CommentCount,
    Id,
}

impl PostListOrderBy {
    /// Remote API value.
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::LastModified => "modified",
            Self::Title => "title",
            Self::CommentCount => "comment_count",
            Self::Id => "ID",
        }
    }
}

impl fmt::Display for PostListOrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown post order-by '{0}'")]
pub struct UnknownPostOrderBy(pub String);

impl FromStr for PostListOrderBy {
    type Err = UnknownPostOrderBy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        [
            Self::Date,
            Self::LastModified,
            Self::Title,
            Self::CommentCount,
            Self::Id,
        ]
        .into_iter()
        .find(|candidate| candidate.value().to_ascii_lowercase() == wanted)
        .ok_or_else(|| UnknownPostOrderBy(s.to_string()))
    }
}

/// Publication status used as a post list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostStatus {
    Published,
    Draft,
    Private,
    Pending,
    Trashed,
    Scheduled,
}

impl PostStatus {
    /// Statuses shown when the caller does not filter.
    pub const DEFAULT_LIST: [Self; 5] = [
        Self::Draft,
        Self::Pending,
        Self::Private,
        Self::Published,
        Self::Scheduled,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Published => "PUBLISHED",
            Self::Draft => "DRAFT",
            Self::Private => "PRIVATE",
            Self::Pending => "PENDING",
            Self::Trashed => "TRASHED",
            Self::Scheduled => "SCHEDULED",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A post list, either for a REST-capable site or a legacy XML-RPC site.
///
/// XML-RPC sites cannot filter by status or search remotely, so that variant
/// carries fewer fields and a distinct key family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PostListDescriptor {
    RestSite {
        site_id: i64,
        statuses: Vec<PostStatus>,
        order: ListOrder,
        order_by: PostListOrderBy,
        search_query: Option<String>,
        page_size: usize,
    },
    XmlRpcSite {
        site_id: i64,
        order: ListOrder,
        order_by: PostListOrderBy,
        page_size: usize,
    },
}

impl PostListDescriptor {
    /// REST site list with default filters and ordering.
    #[must_use]
    pub fn rest(site_id: i64) -> Self {
        Self::RestSite {
            site_id,
            statuses: PostStatus::DEFAULT_LIST.to_vec(),
            order: ListOrder::default(),
            order_by: PostListOrderBy::default(),
            search_query: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// XML-RPC site list with default ordering.
    #[must_use]
    pub const fn xml_rpc(site_id: i64) -> Self {
        Self::XmlRpcSite {
            site_id,
            order: ListOrder::Desc,
            order_by: PostListOrderBy::Date,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub const fn site_id(&self) -> i64 {
        match self {
            Self::RestSite { site_id, .. } | Self::XmlRpcSite { site_id, .. } => *site_id,
        }
    }

    /// Family key shared by every post list of a site.
    #[must_use]
    pub fn type_key_for_site(site_id: i64) -> String {
        CanonicalKey::new("site-post-list")
            .field("site", site_id)
            .finish()
    }
}

impl ListDescriptor for PostListDescriptor {
    fn unique_key(&self) -> String {
        match self {
            Self::RestSite {
                site_id,
                statuses,
                order,
                order_by,
                search_query,
                page_size: _,
            } => CanonicalKey::new("rest-site-post-list")
                .field("site", site_id)
                .list_field("status", statuses)
                .field("order", order)
                .field("order_by", order_by)
                .opt_field("search", search_query.as_deref())
                .finish(),
            Self::XmlRpcSite {
                site_id,
                order,
                order_by,
                page_size: _,
            } => CanonicalKey::new("xml-rpc-site-post-list")
                .field("site", site_id)
                .field("order", order)
                .field("order_by", order_by)
                .finish(),
        }
    }

    fn type_key(&self) -> String {
        Self::type_key_for_site(self.site_id())
    }

    fn page_size(&self) -> usize {
        match self {
            Self::RestSite { page_size, .. } | Self::XmlRpcSite { page_size, .. } => *page_size,
        }
    }
}
