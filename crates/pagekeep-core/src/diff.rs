//! Snapshot diffing.
//!
//! Two snapshots of the same list are compared with a longest common
//! subsequence over identity (Myers, linear space). Unmatched entries that
//! share an identity across the two sides become moves instead of a
//! remove/insert pair; they are paired through hashed identity keys when the
//! callback provides them. The result is an ordered edit script: applying
//! [`Edit`]s in order to the old sequence yields the new one.
//!
//! Script order is removals (highest position first), moves (in new-list
//! order), insertions (ascending), then content changes at final positions.

use std::collections::{HashMap, VecDeque};
use std::ops::{Index, IndexMut, Range};

use serde::Serialize;

use crate::descriptor::{ListDescriptor, ListIdentity};
use crate::manager::ListManager;
use crate::model::RemoteId;
use crate::sectioned::{Entry, SectionedListManager};
use crate::source::ListItem;

/// Comparison predicates for one old/new pair of sequences.
pub trait DiffCallback {
    fn old_len(&self) -> usize;
    fn new_len(&self) -> usize;

    /// Whether both positions denote the same logical entity.
    fn same_identity(&self, old_position: usize, new_position: usize) -> bool;

    /// Only consulted when [`Self::same_identity`] holds.
    fn same_content(&self, old_position: usize, new_position: usize) -> bool;

    /// Hashable identity of an old position. Equal keys must mean
    /// [`Self::same_identity`], and a keyed position never shares an
    /// identity with an unkeyed one. Unkeyed positions are paired by
    /// scanning.
    fn old_key(&self, _old_position: usize) -> Option<u64> {
        None
    }

    /// Counterpart of [`Self::old_key`] for the new side.
    fn new_key(&self, _new_position: usize) -> Option<u64> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    Remove { position: usize, count: usize },
    Insert { position: usize, count: usize },
    /// Take the entry at `from`; it ends up at `to` in the resulting list.
    Move { from: usize, to: usize },
    Change { position: usize, count: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub inserted: usize,
    pub removed: usize,
    pub moved: usize,
    pub changed: usize,
}

impl DiffStats {
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        self.inserted > 0 || self.removed > 0 || self.moved > 0
    }
}

/// Positional callbacks for presentation layers.
pub trait ListUpdateCallback {
    fn on_inserted(&mut self, position: usize, count: usize);
    fn on_removed(&mut self, position: usize, count: usize);
    fn on_moved(&mut self, from: usize, to: usize);
    fn on_changed(&mut self, position: usize, count: usize);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    edits: Vec<Edit>,
    stats: DiffStats,
}

impl DiffResult {
    /// Everything removed, everything inserted. Used when the two sides
    /// belong to different lists.
    #[must_use]
    pub fn replace(old_len: usize, new_len: usize) -> Self {
        let mut script = Script::default();
        if old_len > 0 {
            script.push(Edit::Remove {
                position: 0,
                count: old_len,
            });
        }
        if new_len > 0 {
            script.push(Edit::Insert {
                position: 0,
                count: new_len,
            });
        }
        script.finish()
    }

    #[must_use]
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    #[must_use]
    pub const fn stats(&self) -> DiffStats {
        self.stats
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Replay the script as callbacks, in order.
    pub fn dispatch_updates_to(&self, callback: &mut impl ListUpdateCallback) {
        for edit in &self.edits {
            match *edit {
                Edit::Remove { position, count } => callback.on_removed(position, count),
                Edit::Insert { position, count } => callback.on_inserted(position, count),
                Edit::Move { from, to } => callback.on_moved(from, to),
                Edit::Change { position, count } => callback.on_changed(position, count),
            }
        }
    }
}

/// Compute the edit script turning the old side of `callback` into the new.
pub fn calculate_diff(callback: &impl DiffCallback) -> DiffResult {
    let old_len = callback.old_len();
    let new_len = callback.new_len();

    let mut old_to_new: Vec<Option<usize>> = vec![None; old_len];
    let mut new_to_old: Vec<Option<usize>> = vec![None; new_len];
    let mut moved = vec![false; new_len];

    let mut matcher = Matcher::new(callback, old_len, new_len);
    matcher.conquer(0..old_len, 0..new_len);
    for (old, new) in matcher.matches {
        old_to_new[old] = Some(new);
        new_to_old[new] = Some(old);
    }

    // Pair leftover entries that exist on both sides.
    let mut leftovers = Leftovers::collect(callback, &old_to_new);
    for new in 0..new_len {
        if new_to_old[new].is_some() {
            continue;
        }
        if let Some(old) = leftovers.take(callback, new) {
            old_to_new[old] = Some(new);
            new_to_old[new] = Some(old);
            moved[new] = true;
        }
    }

    let mut script = Script::default();
    for old in (0..old_len).rev() {
        if old_to_new[old].is_none() {
            script.push(Edit::Remove {
                position: old,
                count: 1,
            });
        }
    }

    let mut working = Working::new(&old_to_new);
    let mut predecessor: Option<usize> = None;
    for new in 0..new_len {
        let Some(old) = new_to_old[new] else {
            continue;
        };
        if moved[new] {
            if let Some((from, to)) = working.move_after(old, predecessor) {
                if from != to {
                    script.push(Edit::Move { from, to });
                }
            }
        }
        predecessor = Some(old);
    }

    for new in 0..new_len {
        if new_to_old[new].is_none() {
            script.push(Edit::Insert {
                position: new,
                count: 1,
            });
        }
    }

    for (new, old) in new_to_old.iter().enumerate() {
        if let Some(old) = *old {
            if !callback.same_content(old, new) {
                script.push(Edit::Change {
                    position: new,
                    count: 1,
                });
            }
        }
    }

    script.finish()
}

/// Unmatched old positions waiting for a partner, oldest first.
struct Leftovers {
    keyed: HashMap<u64, VecDeque<usize>>,
    unkeyed: Vec<usize>,
}

impl Leftovers {
    fn collect(callback: &impl DiffCallback, old_to_new: &[Option<usize>]) -> Self {
        let mut keyed: HashMap<u64, VecDeque<usize>> = HashMap::new();
        let mut unkeyed = Vec::new();
        for (old, _) in old_to_new.iter().enumerate().filter(|(_, new)| new.is_none()) {
            match callback.old_key(old) {
                Some(key) => keyed.entry(key).or_default().push_back(old),
                None => unkeyed.push(old),
            }
        }
        Self { keyed, unkeyed }
    }

    /// Lowest unpaired old position sharing `new`'s identity.
    fn take(&mut self, callback: &impl DiffCallback, new: usize) -> Option<usize> {
        if let Some(key) = callback.new_key(new) {
            return self.keyed.get_mut(&key)?.pop_front();
        }
        let slot = self
            .unkeyed
            .iter()
            .position(|&old| callback.same_identity(old, new))?;
        Some(self.unkeyed.remove(slot))
    }
}

/// Surviving old positions in their current order, with a reverse index.
struct Working {
    order: Vec<usize>,
    slots: Vec<Option<usize>>,
}

impl Working {
    fn new(old_to_new: &[Option<usize>]) -> Self {
        let order: Vec<usize> = (0..old_to_new.len())
            .filter(|&old| old_to_new[old].is_some())
            .collect();
        let mut slots = vec![None; old_to_new.len()];
        for (slot, &old) in order.iter().enumerate() {
            slots[old] = Some(slot);
        }
        Self { order, slots }
    }

    /// Move `old` to just after `predecessor` (or to the front) and return
    /// `(from, to)`. Only the slots between the two positions are reindexed.
    fn move_after(&mut self, old: usize, predecessor: Option<usize>) -> Option<(usize, usize)> {
        let from = self.slots[old]?;
        let to = match predecessor.and_then(|pred| self.slots[pred]) {
            Some(pred) if pred > from => pred,
            Some(pred) => pred + 1,
            None => 0,
        };
        let entry = self.order.remove(from);
        self.order.insert(to, entry);
        for slot in from.min(to)..=from.max(to) {
            self.slots[self.order[slot]] = Some(slot);
        }
        Some((from, to))
    }
}

/// Accumulates edits, merging runs of the same kind.
#[derive(Debug, Default)]
struct Script {
    edits: Vec<Edit>,
    stats: DiffStats,
}

impl Script {
    fn push(&mut self, edit: Edit) {
        match edit {
            Edit::Remove { count, .. } => self.stats.removed += count,
            Edit::Insert { count, .. } => self.stats.inserted += count,
            Edit::Move { .. } => self.stats.moved += 1,
            Edit::Change { count, .. } => self.stats.changed += count,
        }

        let merged = match (self.edits.last_mut(), edit) {
            (
                Some(Edit::Remove { position, count }),
                Edit::Remove {
                    position: next,
                    count: more,
                },
            ) if next + more == *position => {
                *position = next;
                *count += more;
                true
            }
            (
                Some(Edit::Insert { position, count }),
                Edit::Insert {
                    position: next,
                    count: more,
                },
            )
            | (
                Some(Edit::Change { position, count }),
                Edit::Change {
                    position: next,
                    count: more,
                },
            ) if next == *position + *count => {
                *count += more;
                true
            }
            _ => false,
        };
        if !merged {
            self.edits.push(edit);
        }
    }

    fn finish(self) -> DiffResult {
        DiffResult {
            edits: self.edits,
            stats: self.stats,
        }
    }
}

// ---------------------------------------------------------------------------
// Longest common subsequence over identity
// ---------------------------------------------------------------------------

/// Furthest-reaching x per diagonal, indexed by signed diagonal `k`.
#[derive(Debug)]
struct Frontier {
    offset: isize,
    v: Vec<usize>,
}

impl Frontier {
    fn new(max_d: usize) -> Self {
        Self {
            offset: signed(max_d),
            v: vec![0; 2 * max_d + 2],
        }
    }
}

impl Index<isize> for Frontier {
    type Output = usize;

    fn index(&self, k: isize) -> &usize {
        &self.v[unsigned(k + self.offset)]
    }
}

impl IndexMut<isize> for Frontier {
    fn index_mut(&mut self, k: isize) -> &mut usize {
        &mut self.v[unsigned(k + self.offset)]
    }
}

#[allow(clippy::cast_possible_wrap)]
const fn signed(value: usize) -> isize {
    value as isize
}

#[allow(clippy::cast_sign_loss)]
const fn unsigned(value: isize) -> usize {
    value as usize
}

const fn max_d(old_len: usize, new_len: usize) -> usize {
    (old_len + new_len).div_ceil(2) + 1
}

struct Matcher<'a, C> {
    callback: &'a C,
    forward: Frontier,
    backward: Frontier,
    /// Matched `(old, new)` pairs in ascending order.
    matches: Vec<(usize, usize)>,
}

impl<'a, C: DiffCallback> Matcher<'a, C> {
    fn new(callback: &'a C, old_len: usize, new_len: usize) -> Self {
        let max_d = max_d(old_len, new_len);
        Self {
            callback,
            forward: Frontier::new(max_d),
            backward: Frontier::new(max_d),
            matches: Vec::new(),
        }
    }

    fn common_prefix(&self, old: Range<usize>, new: Range<usize>) -> usize {
        old.zip(new)
            .take_while(|&(o, n)| self.callback.same_identity(o, n))
            .count()
    }

    fn common_suffix(&self, old: Range<usize>, new: Range<usize>) -> usize {
        old.rev()
            .zip(new.rev())
            .take_while(|&(o, n)| self.callback.same_identity(o, n))
            .count()
    }

    fn conquer(&mut self, mut old: Range<usize>, mut new: Range<usize>) {
        let prefix = self.common_prefix(old.clone(), new.clone());
        for i in 0..prefix {
            self.matches.push((old.start + i, new.start + i));
        }
        old.start += prefix;
        new.start += prefix;

        let suffix = self.common_suffix(old.clone(), new.clone());
        old.end -= suffix;
        new.end -= suffix;
        let suffix_start = (old.end, new.end);

        if !old.is_empty() && !new.is_empty() {
            if let Some((x, y)) = self.middle_snake(old.clone(), new.clone()) {
                self.conquer(old.start..x, new.start..y);
                self.conquer(x..old.end, y..new.end);
            }
        }

        for i in 0..suffix {
            self.matches.push((suffix_start.0 + i, suffix_start.1 + i));
        }
    }

    /// Start of the middle snake of an optimal path through the two ranges.
    fn middle_snake(&mut self, old: Range<usize>, new: Range<usize>) -> Option<(usize, usize)> {
        let n = old.len();
        let m = new.len();
        let delta = signed(n) - signed(m);
        let odd = delta & 1 == 1;
        self.forward[1] = 0;
        self.backward[1] = 0;

        let limit = signed(max_d(n, m));
        for d in 0..limit {
            for k in (-d..=d).rev().step_by(2) {
                let mut x = if k == -d || (k != d && self.forward[k - 1] < self.forward[k + 1]) {
                    self.forward[k + 1]
                } else {
                    self.forward[k - 1] + 1
                };
                let y = unsigned(signed(x) - k);
                let (x0, y0) = (x, y);
                if x < n && y < m {
                    x += self.common_prefix(old.start + x..old.end, new.start + y..new.end);
                }
                self.forward[k] = x;
                if odd
                    && (k - delta).abs() < d
                    && self.forward[k] + self.backward[-(k - delta)] >= n
                {
                    return Some((old.start + x0, new.start + y0));
                }
            }

            for k in (-d..=d).rev().step_by(2) {
                let mut x = if k == -d || (k != d && self.backward[k - 1] < self.backward[k + 1]) {
                    self.backward[k + 1]
                } else {
                    self.backward[k - 1] + 1
                };
                let mut y = unsigned(signed(x) - k);
                if x < n && y < m {
                    let advance =
                        self.common_suffix(old.start..old.start + n - x, new.start..new.start + m - y);
                    x += advance;
                    y += advance;
                }
                self.backward[k] = x;
                if !odd
                    && (k - delta).abs() <= d
                    && self.backward[k] + self.forward[-(k - delta)] >= n
                {
                    return Some((old.start + n - x, new.start + m - y));
                }
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// A snapshot that can be compared position-by-position with another of
/// the same kind.
pub trait Diffable {
    fn list_identity(&self) -> ListIdentity;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn same_identity_at(&self, position: usize, other: &Self, other_position: usize) -> bool;
    fn same_content_at(&self, position: usize, other: &Self, other_position: usize) -> bool;

    /// See [`DiffCallback::old_key`].
    fn identity_key_at(&self, _position: usize) -> Option<u64> {
        None
    }
}

impl<D: ListDescriptor, T: ListItem> Diffable for ListManager<D, T> {
    fn list_identity(&self) -> ListIdentity {
        self.identity()
    }

    fn len(&self) -> usize {
        self.size()
    }

    fn same_identity_at(&self, position: usize, other: &Self, other_position: usize) -> bool {
        Self::same_identity_at(self, position, other, other_position)
    }

    fn same_content_at(&self, position: usize, other: &Self, other_position: usize) -> bool {
        Self::same_content_at(self, position, other, other_position)
    }

    fn identity_key_at(&self, position: usize) -> Option<u64> {
        self.remote_id_at(position).map(remote_key)
    }
}

impl<D: ListDescriptor, T: ListItem> Diffable for SectionedListManager<D, T> {
    fn list_identity(&self) -> ListIdentity {
        self.identity()
    }

    fn len(&self) -> usize {
        self.size()
    }

    fn same_identity_at(&self, position: usize, other: &Self, other_position: usize) -> bool {
        Self::are_items_the_same(self, other, position, other_position)
    }

    fn same_content_at(&self, position: usize, other: &Self, other_position: usize) -> bool {
        match (self.get(position), other.get(other_position)) {
            (Some(a), Some(b)) => a.same_content(&b),
            _ => false,
        }
    }

    /// Section headers stay unkeyed.
    fn identity_key_at(&self, position: usize) -> Option<u64> {
        match self.get(position)? {
            Entry::Item(item) => Some(remote_key(item.remote_id())),
            Entry::Section(_) => None,
        }
    }
}

const fn remote_key(id: RemoteId) -> u64 {
    u64::from_le_bytes(id.0.to_le_bytes())
}

struct SnapshotPair<'a, S> {
    old: &'a S,
    new: &'a S,
}

impl<S: Diffable> DiffCallback for SnapshotPair<'_, S> {
    fn old_len(&self) -> usize {
        self.old.len()
    }

    fn new_len(&self) -> usize {
        self.new.len()
    }

    fn same_identity(&self, old_position: usize, new_position: usize) -> bool {
        self.old.same_identity_at(old_position, self.new, new_position)
    }

    fn same_content(&self, old_position: usize, new_position: usize) -> bool {
        self.old.same_content_at(old_position, self.new, new_position)
    }

    fn old_key(&self, old_position: usize) -> Option<u64> {
        self.old.identity_key_at(old_position)
    }

    fn new_key(&self, new_position: usize) -> Option<u64> {
        self.new.identity_key_at(new_position)
    }
}

/// Diff two snapshots. Snapshots of different lists are never matched
/// entry by entry; the result replaces everything.
pub fn diff_snapshots<S: Diffable>(old: &S, new: &S) -> DiffResult {
    if old.list_identity() != new.list_identity() {
        return DiffResult::replace(old.len(), new.len());
    }
    calculate_diff(&SnapshotPair { old, new })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `(id, content)` pairs.
    struct Pairs<'a> {
        old: &'a [(u32, &'a str)],
        new: &'a [(u32, &'a str)],
    }

    impl DiffCallback for Pairs<'_> {
        fn old_len(&self) -> usize {
            self.old.len()
        }

        fn new_len(&self) -> usize {
            self.new.len()
        }

        fn same_identity(&self, o: usize, n: usize) -> bool {
            self.old[o].0 == self.new[n].0
        }

        fn same_content(&self, o: usize, n: usize) -> bool {
            self.old[o].1 == self.new[n].1
        }
    }

    /// [`Pairs`] with identity keys.
    struct Keyed<'a>(Pairs<'a>);

    impl DiffCallback for Keyed<'_> {
        fn old_len(&self) -> usize {
            self.0.old_len()
        }

        fn new_len(&self) -> usize {
            self.0.new_len()
        }

        fn same_identity(&self, o: usize, n: usize) -> bool {
            self.0.same_identity(o, n)
        }

        fn same_content(&self, o: usize, n: usize) -> bool {
            self.0.same_content(o, n)
        }

        fn old_key(&self, o: usize) -> Option<u64> {
            Some(u64::from(self.0.old[o].0))
        }

        fn new_key(&self, n: usize) -> Option<u64> {
            Some(u64::from(self.0.new[n].0))
        }
    }

    fn ids(raw: &[u32]) -> Vec<(u32, &'static str)> {
        raw.iter().map(|id| (*id, "")).collect()
    }

    fn apply(old: &[(u32, &str)], result: &DiffResult) -> Vec<u32> {
        let mut list: Vec<u32> = old.iter().map(|(id, _)| *id).collect();
        for edit in result.edits() {
            match *edit {
                Edit::Remove { position, count } => {
                    list.drain(position..position + count);
                }
                Edit::Insert { position, count } => {
                    for i in 0..count {
                        list.insert(position + i, u32::MAX);
                    }
                }
                Edit::Move { from, to } => {
                    let id = list.remove(from);
                    list.insert(to, id);
                }
                Edit::Change { .. } => {}
            }
        }
        list
    }

    fn check(old: &[(u32, &str)], new: &[(u32, &str)]) -> DiffResult {
        let result = calculate_diff(&Pairs { old, new });
        let applied = apply(old, &result);
        assert_eq!(applied.len(), new.len());
        for (got, (want, _)) in applied.iter().zip(new) {
            if *got != u32::MAX {
                assert_eq!(got, want, "script {:?}", result.edits());
            }
        }
        result
    }

    #[test]
    fn self_diff_is_empty() {
        let list = ids(&[1, 2, 3, 4]);
        let result = check(&list, &list);
        assert!(result.is_empty());
        assert_eq!(result.stats(), DiffStats::default());
    }

    #[test]
    fn swapped_tail_is_one_move() {
        let result = check(&ids(&[1, 2, 3]), &ids(&[1, 3, 2]));
        assert_eq!(
            result.stats(),
            DiffStats {
                moved: 1,
                ..DiffStats::default()
            }
        );
    }

    #[test]
    fn content_change_only() {
        let result = check(&[(1, "pending")], &[(1, "completed")]);
        assert_eq!(
            result.edits(),
            [Edit::Change {
                position: 0,
                count: 1
            }]
        );
        assert!(!result.stats().is_structural());
    }

    #[test]
    fn runs_are_coalesced() {
        let result = check(&ids(&[1, 2, 3, 4, 5]), &ids(&[1, 5, 6, 7]));
        assert_eq!(
            result.edits(),
            [
                Edit::Remove {
                    position: 1,
                    count: 3
                },
                Edit::Insert {
                    position: 2,
                    count: 2
                },
            ]
        );
        assert_eq!(result.stats().removed, 3);
        assert_eq!(result.stats().inserted, 2);
    }

    #[test]
    fn reversal_moves_without_structural_churn() {
        let result = check(&ids(&[1, 2, 3, 4]), &ids(&[4, 3, 2, 1]));
        assert_eq!(result.stats().inserted, 0);
        assert_eq!(result.stats().removed, 0);
        assert_eq!(result.stats().moved, 3);
    }

    #[test]
    fn empty_sides() {
        let filled = ids(&[1, 2]);
        assert_eq!(check(&[], &filled).stats().inserted, 2);
        assert_eq!(check(&filled, &[]).stats().removed, 2);
        assert!(check(&[], &[]).is_empty());
    }

    #[test]
    fn keyed_leftovers_pair_oldest_first() {
        let old = [(1, "a"), (2, ""), (1, "b"), (3, "")];
        let new = [(3, ""), (1, "a"), (1, "b"), (2, "")];
        let scanned = check(&old, &new);
        let keyed = calculate_diff(&Keyed(Pairs {
            old: &old,
            new: &new,
        }));
        assert_eq!(keyed, scanned);
    }

    #[test]
    fn working_order_keeps_reverse_index_in_step() {
        let mut working = Working::new(&[Some(0), None, Some(2), Some(1), Some(3)]);
        assert_eq!(working.order, [0, 2, 3, 4]);

        assert_eq!(working.move_after(4, None), Some((3, 0)));
        assert_eq!(working.move_after(0, Some(3)), Some((1, 3)));
        assert_eq!(working.order, [4, 2, 3, 0]);
        for (slot, &old) in working.order.iter().enumerate() {
            assert_eq!(working.slots[old], Some(slot));
        }
        assert_eq!(working.move_after(1, None), None);
    }

    #[test]
    fn repeated_diffs_are_identical() {
        let old = ids(&[5, 1, 9, 2, 7, 3]);
        let new = ids(&[1, 2, 8, 3, 5, 7]);
        assert_eq!(check(&old, &new), check(&old, &new));
    }

    #[test]
    fn replace_clears_and_refills() {
        let result = DiffResult::replace(3, 2);
        assert_eq!(
            result.edits(),
            [
                Edit::Remove {
                    position: 0,
                    count: 3
                },
                Edit::Insert {
                    position: 0,
                    count: 2
                },
            ]
        );
        assert!(DiffResult::replace(0, 0).is_empty());
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl ListUpdateCallback for Recorder {
        fn on_inserted(&mut self, position: usize, count: usize) {
            self.0.push(format!("insert {position}+{count}"));
        }

        fn on_removed(&mut self, position: usize, count: usize) {
            self.0.push(format!("remove {position}+{count}"));
        }

        fn on_moved(&mut self, from: usize, to: usize) {
            self.0.push(format!("move {from}->{to}"));
        }

        fn on_changed(&mut self, position: usize, count: usize) {
            self.0.push(format!("change {position}+{count}"));
        }
    }

    #[test]
    fn dispatch_follows_script_order() {
        let old = [(1, "a"), (2, "b"), (3, "c")];
        let new = [(3, "c"), (1, "a2"), (4, "d")];
        let result = check(&old, &new);

        let mut recorder = Recorder::default();
        result.dispatch_updates_to(&mut recorder);
        assert_eq!(recorder.0.len(), result.edits().len());
        assert_eq!(recorder.0.first().map(String::as_str), Some("remove 1+1"));
        assert!(recorder.0.contains(&"change 1+1".to_string()));
    }
}
