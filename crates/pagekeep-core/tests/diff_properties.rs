use proptest::prelude::*;
use std::collections::HashSet;

use pagekeep_core::descriptor::{
    ListOrder, OrderListDescriptor, PostListDescriptor, PostListOrderBy, PostStatus,
};
use pagekeep_core::diff::DiffCallback;
use pagekeep_core::sectioned::Row;
use pagekeep_core::{
    ChunkedSections, DiffResult, Edit, GroupingPolicy, ItemRef, ListDescriptor, calculate_diff,
};

#[path = "fakes.rs"]
mod fakes;
use fakes::Product;

/// `(id, version)` rows; versions stand in for rendered content.
struct Rows<'a> {
    old: &'a [(u8, u8)],
    new: &'a [(u8, u8)],
}

impl DiffCallback for Rows<'_> {
    fn old_len(&self) -> usize {
        self.old.len()
    }

    fn new_len(&self) -> usize {
        self.new.len()
    }

    fn same_identity(&self, old: usize, new: usize) -> bool {
        self.old[old].0 == self.new[new].0
    }

    fn same_content(&self, old: usize, new: usize) -> bool {
        self.old[old].1 == self.new[new].1
    }
}

/// [`Rows`] that also hands out hashable identities.
struct KeyedRows<'a>(Rows<'a>);

impl DiffCallback for KeyedRows<'_> {
    fn old_len(&self) -> usize {
        self.0.old_len()
    }

    fn new_len(&self) -> usize {
        self.0.new_len()
    }

    fn same_identity(&self, old: usize, new: usize) -> bool {
        self.0.same_identity(old, new)
    }

    fn same_content(&self, old: usize, new: usize) -> bool {
        self.0.same_content(old, new)
    }

    fn old_key(&self, old: usize) -> Option<u64> {
        Some(u64::from(self.0.old[old].0))
    }

    fn new_key(&self, new: usize) -> Option<u64> {
        Some(u64::from(self.0.new[new].0))
    }
}

/// Replays `result` over `old`, filling inserted slots from `new`.
fn replay(old: &[(u8, u8)], new: &[(u8, u8)], result: &DiffResult) -> Vec<(u8, u8)> {
    let mut rows = old.to_vec();
    for edit in result.edits() {
        match *edit {
            Edit::Remove { position, count } => {
                rows.drain(position..position + count);
            }
            Edit::Insert { position, count } => {
                for offset in 0..count {
                    rows.insert(position + offset, new[position + offset]);
                }
            }
            Edit::Move { from, to } => {
                let row = rows.remove(from);
                rows.insert(to, row);
            }
            Edit::Change { position, count } => {
                rows[position..position + count].copy_from_slice(&new[position..position + count]);
            }
        }
    }
    rows
}

/// Distinct ids in random order, each with a small content version.
fn arb_rows() -> impl Strategy<Value = Vec<(u8, u8)>> {
    prop::collection::vec((0u8..40, 0u8..3), 0..30).prop_map(|rows| {
        let mut seen = HashSet::new();
        rows.into_iter().filter(|(id, _)| seen.insert(*id)).collect()
    })
}

fn arb_status() -> impl Strategy<Value = PostStatus> {
    prop_oneof![
        Just(PostStatus::Published),
        Just(PostStatus::Draft),
        Just(PostStatus::Private),
        Just(PostStatus::Pending),
        Just(PostStatus::Trashed),
        Just(PostStatus::Scheduled),
    ]
}

fn arb_order_by() -> impl Strategy<Value = PostListOrderBy> {
    prop_oneof![
        Just(PostListOrderBy::Date),
        Just(PostListOrderBy::LastModified),
        Just(PostListOrderBy::Title),
        Just(PostListOrderBy::CommentCount),
        Just(PostListOrderBy::Id),
    ]
}

type RestFields = (i64, Vec<PostStatus>, bool, PostListOrderBy, Option<String>);

fn arb_rest_fields() -> impl Strategy<Value = RestFields> {
    (
        0i64..4,
        prop::collection::vec(arb_status(), 0..4),
        any::<bool>(),
        arb_order_by(),
        prop::option::of("[a-z|=:;~-]{0,6}"),
    )
}

fn rest(fields: &RestFields, page_size: usize) -> PostListDescriptor {
    let (site_id, statuses, ascending, order_by, search_query) = fields.clone();
    PostListDescriptor::RestSite {
        site_id,
        statuses,
        order: if ascending { ListOrder::Asc } else { ListOrder::Desc },
        order_by,
        search_query,
        page_size,
    }
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn script_turns_old_into_new(old in arb_rows(), new in arb_rows()) {
        let result = calculate_diff(&Rows { old: &old, new: &new });
        prop_assert_eq!(replay(&old, &new, &result), new.clone());

        let stats = result.stats();
        let old_ids: HashSet<u8> = old.iter().map(|row| row.0).collect();
        let new_ids: HashSet<u8> = new.iter().map(|row| row.0).collect();
        prop_assert_eq!(stats.removed, old_ids.difference(&new_ids).count());
        prop_assert_eq!(stats.inserted, new_ids.difference(&old_ids).count());
    }

    #[test]
    fn content_changes_are_reported_once(old in arb_rows(), new in arb_rows()) {
        let result = calculate_diff(&Rows { old: &old, new: &new });
        let expected = new
            .iter()
            .filter(|(id, version)| old.iter().any(|(o, v)| o == id && v != version))
            .count();
        prop_assert_eq!(result.stats().changed, expected);
    }

    #[test]
    fn self_diff_is_empty(rows in arb_rows()) {
        let result = calculate_diff(&Rows { old: &rows, new: &rows });
        prop_assert!(result.is_empty());
    }

    #[test]
    fn keeping_relative_order_never_moves(rows in arb_rows(), keep in prop::collection::vec(any::<bool>(), 30)) {
        let kept: Vec<(u8, u8)> = rows
            .iter()
            .zip(&keep)
            .filter(|(_, keep)| **keep)
            .map(|(row, _)| *row)
            .collect();
        let result = calculate_diff(&Rows { old: &rows, new: &kept });
        prop_assert_eq!(result.stats().moved, 0);
        prop_assert_eq!(result.stats().inserted, 0);
    }

    #[test]
    fn keyed_pairing_matches_scanning(old in arb_rows(), new in arb_rows()) {
        let scanned = calculate_diff(&Rows { old: &old, new: &new });
        let keyed = calculate_diff(&KeyedRows(Rows { old: &old, new: &new }));
        prop_assert_eq!(keyed, scanned);
    }

    #[test]
    fn diff_is_stable(old in arb_rows(), new in arb_rows()) {
        let first = calculate_diff(&Rows { old: &old, new: &new });
        let second = calculate_diff(&Rows { old: &old, new: &new });
        prop_assert_eq!(first, second);
    }

    #[test]
    fn identity_is_deterministic(fields in arb_rest_fields(), page_size in 1usize..500) {
        let a = rest(&fields, page_size);
        let b = rest(&fields, 100);
        prop_assert_eq!(a.identity(), a.identity());
        prop_assert_eq!(a.identity(), b.clone().identity());
        prop_assert_eq!(a.type_id(), PostListDescriptor::xml_rpc(fields.0).type_id());
    }

    #[test]
    fn differing_fields_give_differing_ids(a in arb_rest_fields(), b in arb_rest_fields()) {
        prop_assume!(a != b);
        prop_assert_ne!(rest(&a, 100).list_id(), rest(&b, 100).list_id());
    }

    #[test]
    fn order_filters_are_distinct(site in 0i64..1000, status in prop::option::of("[a-z-]{0,8}")) {
        let filtered = match &status {
            Some(status) => OrderListDescriptor::new(site).with_status(status.clone()),
            None => OrderListDescriptor::new(site),
        };
        prop_assert_eq!(filtered.type_id(), OrderListDescriptor::new(site).type_id());
        if status.is_some() {
            prop_assert_ne!(filtered.list_id(), OrderListDescriptor::new(site).list_id());
        }
    }

    #[test]
    fn chunked_sections_add_one_marker_per_run(n in 0usize..120, chunk in 1usize..15) {
        let products: Vec<Product> = (0..n)
            .map(|id| Product::new(i64::try_from(id).unwrap_or_default(), "p", "s"))
            .collect();
        let refs: Vec<ItemRef<'_, Product>> = products.iter().map(ItemRef::Ready).collect();
        let rows = ChunkedSections::new(chunk).group(&refs);
        prop_assert_eq!(rows.len(), n + n.div_ceil(chunk));
        for (position, row) in rows.iter().enumerate() {
            let is_section = matches!(row, Row::Section(_));
            prop_assert_eq!(is_section, position % (chunk + 1) == 0);
        }
    }
}
