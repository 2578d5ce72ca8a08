//! Background snapshot building for one visible list.
//!
//! A [`ListFeed`] tracks the descriptor currently on screen. Every request
//! to (re)build bumps a generation counter and submits a build-then-diff job
//! to the [`WorkerPool`]. A job only applies its result if its generation is
//! still the newest and the active descriptor is still the one it built;
//! this is checked before diffing and again, under the snapshot lock, right
//! before applying. Superseded jobs finish their I/O and are discarded.
//!
//! Applied results are delivered to the consumer thread as [`FeedUpdate`]s.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::descriptor::{ListDescriptor, ListIdentity};
use crate::diff::{DiffResult, Diffable, diff_snapshots};
use crate::error::StoreError;
use crate::event::{ListEvent, Subscription};
use crate::manager::ListManager;
use crate::sectioned::SectionedListManager;
use crate::source::ListItem;
use crate::worker::{TaskHandle, WorkerPool};

/// A snapshot type a feed can build, diff, and refresh.
pub trait FeedSnapshot: Diffable + Send + Sync + 'static {
    /// Ask for the first page of the underlying list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list record cannot be updated.
    fn refresh(&self) -> Result<bool, StoreError>;
}

impl<D: ListDescriptor, T: ListItem> FeedSnapshot for ListManager<D, T> {
    fn refresh(&self) -> Result<bool, StoreError> {
        Self::refresh(self)
    }
}

impl<D: ListDescriptor, T: ListItem> FeedSnapshot for SectionedListManager<D, T> {
    fn refresh(&self) -> Result<bool, StoreError> {
        Self::refresh(self)
    }
}

/// An applied snapshot and the script from the previously applied one.
#[derive(Debug)]
pub struct FeedUpdate<M> {
    pub generation: u64,
    pub snapshot: Arc<M>,
    pub diff: DiffResult,
}

type Builder<D, M> = dyn Fn(&D) -> Result<M, StoreError> + Send + Sync;

struct Shared<D, M> {
    generation: AtomicU64,
    active: Mutex<Option<D>>,
    current: Mutex<Option<Arc<M>>>,
    build: Box<Builder<D, M>>,
    updates: Sender<FeedUpdate<M>>,
}

impl<D: ListDescriptor, M: FeedSnapshot> Shared<D, M> {
    fn is_current(&self, generation: u64, identity: ListIdentity) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
            && self
                .active
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .as_ref()
                .is_some_and(|active| active.identity() == identity)
    }

    fn run(&self, generation: u64, descriptor: &D, fetch_after: bool) -> bool {
        let identity = descriptor.identity();
        if !self.is_current(generation, identity) {
            debug!(generation, list_id = %identity.id, "build superseded before start");
            return false;
        }

        let snapshot = match (self.build)(descriptor) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(generation, list_id = %identity.id, code = err.code().code(), "snapshot build failed: {err}");
                return false;
            }
        };

        if !self.is_current(generation, identity) {
            debug!(generation, list_id = %identity.id, "dropping stale build");
            return false;
        }

        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let diff = previous.as_ref().map_or_else(
            || DiffResult::replace(0, snapshot.len()),
            |previous| diff_snapshots(previous.as_ref(), &snapshot),
        );

        let snapshot = Arc::new(snapshot);
        {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            let unchanged_base = match (&*current, &previous) {
                (Some(now), Some(before)) => Arc::ptr_eq(now, before),
                (None, None) => true,
                _ => false,
            };
            if !unchanged_base || !self.is_current(generation, identity) {
                debug!(generation, list_id = %identity.id, "dropping stale diff");
                return false;
            }
            *current = Some(Arc::clone(&snapshot));
            let stats = diff.stats();
            debug!(
                generation,
                list_id = %identity.id,
                inserted = stats.inserted,
                removed = stats.removed,
                moved = stats.moved,
                changed = stats.changed,
                "applied snapshot"
            );
            // The consumer may have gone away; the snapshot is still current.
            let _ = self.updates.send(FeedUpdate {
                generation,
                snapshot: Arc::clone(&snapshot),
                diff,
            });
        }

        if fetch_after {
            if let Err(err) = snapshot.refresh() {
                warn!(list_id = %identity.id, "refresh after build failed: {err}");
            }
        }
        true
    }
}

/// Owner of the visible list's snapshot lifecycle.
pub struct ListFeed<D: ListDescriptor, M: FeedSnapshot> {
    shared: Arc<Shared<D, M>>,
    pool: Arc<WorkerPool>,
    updates: Receiver<FeedUpdate<M>>,
}

impl<D: ListDescriptor, M: FeedSnapshot> ListFeed<D, M> {
    /// `build` turns a descriptor into a snapshot; it runs on the pool.
    pub fn new<F>(pool: Arc<WorkerPool>, build: F) -> Self
    where
        F: Fn(&D) -> Result<M, StoreError> + Send + Sync + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                active: Mutex::new(None),
                current: Mutex::new(None),
                build: Box::new(build),
                updates: tx,
            }),
            pool,
            updates: rx,
        }
    }

    /// Make `descriptor` the active list and schedule a build. With
    /// `fetch_after`, the first page is requested once the build applied.
    ///
    /// Switching to a different list clears the current snapshot, so the
    /// first update for it replaces everything.
    pub fn show(&self, descriptor: D, fetch_after: bool) -> TaskHandle<bool> {
        let switching = {
            let mut active = self
                .shared
                .active
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let switching = active
                .as_ref()
                .is_none_or(|prev| prev.identity() != descriptor.identity());
            *active = Some(descriptor.clone());
            switching
        };
        if switching {
            self.shared
                .current
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            debug!(list_id = %descriptor.list_id(), "switching active list");
        }
        self.schedule(descriptor, fetch_after)
    }

    /// Rebuild the active list; `None` when nothing is shown.
    pub fn invalidate(&self) -> Option<TaskHandle<bool>> {
        let descriptor = self.active()?;
        Some(self.schedule(descriptor, false))
    }

    /// Rebuild when `event` concerns the active list or its family.
    pub fn handle_event(&self, event: &ListEvent) -> Option<TaskHandle<bool>> {
        let descriptor = self.active()?;
        let identity = descriptor.identity();
        if !event.affects(identity.id, identity.type_id) {
            return None;
        }
        info!(list_id = %identity.id, "list invalidated by store event");
        Some(self.schedule(descriptor, false))
    }

    /// Handle every event already queued on `subscription`. Returns the
    /// handles of the rebuilds that were scheduled.
    pub fn pump(&self, subscription: &Subscription) -> Vec<TaskHandle<bool>> {
        subscription
            .drain()
            .filter_map(|event| self.handle_event(&event))
            .collect()
    }

    #[must_use]
    pub fn active(&self) -> Option<D> {
        self.shared
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn current(&self) -> Option<Arc<M>> {
        self.shared
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn try_next_update(&self) -> Option<FeedUpdate<M>> {
        self.updates.try_recv().ok()
    }

    #[must_use]
    pub fn next_update_timeout(&self, timeout: Duration) -> Option<FeedUpdate<M>> {
        match self.updates.recv_timeout(timeout) {
            Ok(update) => Some(update),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    fn schedule(&self, descriptor: D, fetch_after: bool) -> TaskHandle<bool> {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, list_id = %descriptor.list_id(), "scheduling snapshot build");
        let shared = Arc::clone(&self.shared);
        self.pool
            .submit(move || shared.run(generation, &descriptor, fetch_after))
    }
}

impl<D: ListDescriptor, M: FeedSnapshot> std::fmt::Debug for ListFeed<D, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListFeed")
            .field("generation", &self.generation())
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
