//! Change notifications produced by the list store.
//!
//! Consumers call [`EventHub::subscribe`] and keep the returned
//! [`Subscription`] for as long as they want events; dropping it
//! unsubscribes. Each subscriber owns an unbounded `crossbeam-channel`, so a
//! slow consumer never blocks a writer.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;

use crate::descriptor::{ListId, ListTypeId};

/// Why a list's metadata or index changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    FetchStarted,
    PageFetched,
    FetchFailed,
    ItemsRemoved,
    Invalidated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ListEvent {
    /// Records or indexes of these specific lists changed.
    ListChanged {
        list_ids: Vec<ListId>,
        cause: ChangeCause,
    },
    /// Items of some list in this family changed in the local item store.
    ItemsChanged { type_id: ListTypeId },
    /// Every list was removed.
    AllRemoved,
}

impl ListEvent {
    /// Whether a consumer showing `id` (of family `type_id`) should rebuild.
    #[must_use]
    pub fn affects(&self, id: ListId, type_id: ListTypeId) -> bool {
        match self {
            Self::ListChanged { list_ids, .. } => list_ids.contains(&id),
            Self::ItemsChanged { type_id: changed } => *changed == type_id,
            Self::AllRemoved => true,
        }
    }
}

#[derive(Debug, Default)]
struct Subscribers {
    next_id: u64,
    senders: Vec<(u64, Sender<ListEvent>)>,
}

/// Fan-out point for [`ListEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct EventHub {
    inner: Arc<Mutex<Subscribers>>,
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut subs = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = subs.next_id;
        subs.next_id += 1;
        subs.senders.push((id, tx));
        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
            rx,
        }
    }

    /// Deliver `event` to every live subscriber, pruning closed ones.
    pub fn publish(&self, event: &ListEvent) {
        let mut subs = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        subs.senders.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .senders
            .len()
    }
}

/// A live registration with an [`EventHub`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    hub: Weak<Mutex<Subscribers>>,
    rx: Receiver<ListEvent>,
}

impl Subscription {
    /// Block until the next event; `None` once the hub is gone.
    #[must_use]
    pub fn recv(&self) -> Option<ListEvent> {
        self.rx.recv().ok()
    }

    #[must_use]
    pub fn try_recv(&self) -> Option<ListEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ListEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drain everything already delivered.
    pub fn drain(&self) -> impl Iterator<Item = ListEvent> + '_ {
        self.rx.try_iter()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            let mut subs = hub.lock().unwrap_or_else(PoisonError::into_inner);
            subs.senders.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_published_events() {
        let hub = EventHub::new();
        let a = hub.subscribe();
        let b = hub.subscribe();

        let event = ListEvent::ItemsChanged {
            type_id: ListTypeId(3),
        };
        hub.publish(&event);

        assert_eq!(a.try_recv(), Some(event.clone()));
        assert_eq!(b.try_recv(), Some(event));
        assert_eq!(a.try_recv(), None);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let hub = EventHub::new();
        let first = hub.subscribe();
        let second = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        drop(first);
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(&ListEvent::AllRemoved);
        assert_eq!(second.try_recv(), Some(ListEvent::AllRemoved));
    }

    #[test]
    fn affects_matches_exact_list_or_family() {
        let changed = ListEvent::ListChanged {
            list_ids: vec![ListId(1), ListId(2)],
            cause: ChangeCause::PageFetched,
        };
        assert!(changed.affects(ListId(2), ListTypeId(9)));
        assert!(!changed.affects(ListId(3), ListTypeId(9)));

        let items = ListEvent::ItemsChanged {
            type_id: ListTypeId(9),
        };
        assert!(items.affects(ListId(3), ListTypeId(9)));
        assert!(!items.affects(ListId(3), ListTypeId(8)));
    }
}
