//! List descriptors and their derived identities.
//!
//! A descriptor names one filtered/sorted remote collection. Two values are
//! derived from it:
//!
//! - [`ListId`]: the persistence key for exactly this view (site, filters,
//!   sort order, search query).
//! - [`ListTypeId`]: the coarser family key (e.g. "all post lists of site 7")
//!   used to broadcast "items of this family changed" without descriptor
//!   equality.
//!
//! Both are 64-bit values: the first 8 bytes (little endian) of the BLAKE3
//! digest of a canonical key string. They are persisted as primary keys, so
//! the hash must not vary between processes, platforms or releases; the
//! std `Hasher`s make no such promise. The canonical key is built with
//! [`CanonicalKey`], which length-prefixes every field so that values
//! containing separator characters (a search query of `"-ob"`, say) cannot
//! make two different descriptors produce the same string.

pub mod order;
pub mod post;

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

pub use order::OrderListDescriptor;
pub use post::{
    ListOrder, PostListDescriptor, PostListOrderBy, PostStatus, UnknownListOrder, UnknownPostOrderBy,
};

/// Default remote page size for the bundled descriptors.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Stable identifier for one specific list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListId(pub u64);

/// Stable identifier for a family of lists sharing update notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListTypeId(pub u64);

impl ListId {
    /// Derive the identifier from a canonical key string.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        Self(hash_key(key))
    }
}

impl ListTypeId {
    /// Derive the identifier from a canonical family key string.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        Self(hash_key(key))
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Display for ListTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Both identifiers of a descriptor, computed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListIdentity {
    pub id: ListId,
    pub type_id: ListTypeId,
}

/// A caller-defined value identifying one remote collection view.
///
/// Implementors only provide the canonical key strings; identities are
/// derived from them. Keys must be built from semantic fields only, in a
/// fixed field order, never from addresses or allocation identity.
pub trait ListDescriptor: Clone + Send + Sync + 'static {
    /// Canonical key covering every field that changes the remote result.
    fn unique_key(&self) -> String;

    /// Canonical key covering only the fields that define the family.
    fn type_key(&self) -> String;

    /// Number of remote ids requested per page.
    fn page_size(&self) -> usize {
        DEFAULT_PAGE_SIZE
    }

    fn list_id(&self) -> ListId {
        ListId::from_key(&self.unique_key())
    }

    fn type_id(&self) -> ListTypeId {
        ListTypeId::from_key(&self.type_key())
    }

    fn identity(&self) -> ListIdentity {
        ListIdentity {
            id: self.list_id(),
            type_id: self.type_id(),
        }
    }
}

/// Builder for unambiguous canonical key strings.
///
/// ```
/// use pagekeep_core::descriptor::CanonicalKey;
///
/// let key = CanonicalKey::new("site-post-list").field("site", 7).finish();
/// assert_eq!(key, "site-post-list|site=1:7");
/// ```
#[derive(Debug, Clone)]
pub struct CanonicalKey {
    buf: String,
}

impl CanonicalKey {
    #[must_use]
    pub fn new(family: &str) -> Self {
        Self {
            buf: family.to_string(),
        }
    }

    /// Append `name=<len>:<value>`.
    #[must_use]
    pub fn field(mut self, name: &str, value: impl fmt::Display) -> Self {
        let value = value.to_string();
        let _ = write!(self.buf, "|{name}={}:{value}", value.len());
        self
    }

    /// Append an optional field; `None` is encoded distinctly from `Some("")`.
    #[must_use]
    pub fn opt_field(mut self, name: &str, value: Option<impl fmt::Display>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => {
                let _ = write!(self.buf, "|{name}~");
                self
            }
        }
    }

    /// Append an ordered list of values as one field.
    #[must_use]
    pub fn list_field<I, V>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        let mut joined = String::new();
        for value in values {
            let value = value.to_string();
            let _ = write!(joined, "{}:{value};", value.len());
        }
        self.field(name, joined)
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.buf
    }
}

/// First 8 bytes (little endian) of the BLAKE3 digest of `key`.
fn hash_key(key: &str) -> u64 {
    let digest = blake3::hash(key.as_bytes());
    let mut head = [0_u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}
