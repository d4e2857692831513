//! Subscriber registry
//!
//! UI-level consumers register one callback per feed and receive
//! reconciled updates without touching connections. Disposal fully
//! detaches the callback and is idempotent; the multiplexer wires the
//! last-subscriber-out teardown into the disposer it hands back.
//!
//! A dispatch already in flight when a callback is disposed may still
//! invoke it once; consumers must no-op safely in that window.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::realtime::message::{Feed, FeedEvent};
use crate::realtime::reconciler::EntityId;

/// One reconciled update fanned out to subscribers
#[derive(Debug, Clone)]
pub struct FeedUpdate {
    pub feed: Feed,
    /// The decoded event that caused the update
    pub event: FeedEvent,
    /// Ids whose canonical state changed (empty for pure no-ops and
    /// status notes)
    pub changed: Vec<EntityId>,
}

/// Subscriber callback; invoked on the feed pump, so it must not block
pub type FeedCallback = Arc<dyn Fn(&FeedUpdate) + Send + Sync>;

/// Registered-subscriber id, unique across all feeds
pub type SubscriberId = u64;

// ============================================================================
// REGISTRY
// ============================================================================

/// Per-feed callback registrations
pub struct SubscriberRegistry {
    slots: Mutex<HashMap<Feed, BTreeMap<SubscriberId, FeedCallback>>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Attach a callback to a feed
    pub fn register(&self, feed: Feed, callback: FeedCallback) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.slots
            .lock()
            .entry(feed)
            .or_default()
            .insert(id, callback);
        id
    }

    /// Detach a callback; returns how many subscribers remain on the
    /// feed. Unknown ids are a no-op (idempotent disposal).
    pub fn deregister(&self, feed: Feed, id: SubscriberId) -> usize {
        let mut slots = self.slots.lock();
        match slots.get_mut(&feed) {
            Some(callbacks) => {
                callbacks.remove(&id);
                callbacks.len()
            }
            None => 0,
        }
    }

    /// Number of subscribers currently attached to a feed
    pub fn count(&self, feed: Feed) -> usize {
        self.slots
            .lock()
            .get(&feed)
            .map(|callbacks| callbacks.len())
            .unwrap_or(0)
    }

    /// Fan one update out to every subscriber of its feed, in
    /// registration order. Callbacks run outside the lock so they may
    /// dispose themselves or register others.
    pub fn dispatch(&self, update: &FeedUpdate) {
        let callbacks: Vec<FeedCallback> = {
            let slots = self.slots.lock();
            match slots.get(&update.feed) {
                Some(callbacks) => callbacks.values().cloned().collect(),
                None => return,
            }
        };
        for callback in callbacks {
            callback(update);
        }
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// DISPOSER
// ============================================================================

/// Detaches one registration when invoked (or dropped). Safe to call
/// repeatedly; only the first call runs the teardown.
pub struct Disposer {
    teardown: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Disposer {
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Mutex::new(Some(Box::new(teardown))),
        }
    }

    /// A disposer that does nothing (already-detached placeholder)
    pub fn noop() -> Self {
        Self {
            teardown: Mutex::new(None),
        }
    }

    pub fn dispose(&self) {
        if let Some(teardown) = self.teardown.lock().take() {
            teardown();
        }
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::message::{OrderEvent, StatusNote};
    use parking_lot::Mutex as PlMutex;

    fn update(feed: Feed) -> FeedUpdate {
        FeedUpdate {
            feed,
            event: FeedEvent::Status(StatusNote {
                customer_phone: "0900000001".to_string(),
                message: "test".to_string(),
            }),
            changed: Vec::new(),
        }
    }

    #[test]
    fn test_fan_out_in_registration_order() {
        let registry = SubscriberRegistry::new();
        let seen = Arc::new(PlMutex::new(Vec::new()));

        for label in ["a", "b", "c"] {
            let seen = seen.clone();
            registry.register(
                Feed::OrderStatus,
                Arc::new(move |_| seen.lock().push(label)),
            );
        }

        registry.dispatch(&update(Feed::OrderStatus));
        assert_eq!(*seen.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_deregistered_callback_is_never_invoked_again() {
        let registry = SubscriberRegistry::new();
        let hits = Arc::new(AtomicU64::new(0));
        let other_hits = Arc::new(AtomicU64::new(0));

        let id = {
            let hits = hits.clone();
            registry.register(
                Feed::OrderUpdates,
                Arc::new(move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                }),
            )
        };
        {
            let other_hits = other_hits.clone();
            registry.register(
                Feed::OrderUpdates,
                Arc::new(move |_| {
                    other_hits.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        registry.dispatch(&update(Feed::OrderUpdates));
        let remaining = registry.deregister(Feed::OrderUpdates, id);
        assert_eq!(remaining, 1);
        registry.dispatch(&update(Feed::OrderUpdates));
        registry.dispatch(&update(Feed::OrderUpdates));

        // The disposed subscriber saw only the first dispatch; the
        // surviving one kept receiving
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(other_hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_deregister_is_idempotent() {
        let registry = SubscriberRegistry::new();
        let id = registry.register(Feed::TableUpdates, Arc::new(|_| {}));
        assert_eq!(registry.deregister(Feed::TableUpdates, id), 0);
        assert_eq!(registry.deregister(Feed::TableUpdates, id), 0);
        assert_eq!(registry.count(Feed::TableUpdates), 0);
    }

    #[test]
    fn test_feeds_are_isolated() {
        let registry = SubscriberRegistry::new();
        let hits = Arc::new(AtomicU64::new(0));
        {
            let hits = hits.clone();
            registry.register(
                Feed::TableUpdates,
                Arc::new(move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        registry.dispatch(&update(Feed::OrderUpdates));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_disposer_runs_teardown_exactly_once() {
        let calls = Arc::new(AtomicU64::new(0));
        let disposer = {
            let calls = calls.clone();
            Disposer::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        disposer.dispose();
        disposer.dispose();
        drop(disposer);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disposer_fires_on_drop() {
        let calls = Arc::new(AtomicU64::new(0));
        {
            let calls = calls.clone();
            let _disposer = Disposer::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_receives_the_update_payload() {
        let registry = SubscriberRegistry::new();
        let seen = Arc::new(PlMutex::new(None));
        {
            let seen = seen.clone();
            registry.register(
                Feed::OrderUpdates,
                Arc::new(move |u: &FeedUpdate| {
                    *seen.lock() = Some((u.changed.clone(), u.feed));
                }),
            );
        }

        registry.dispatch(&FeedUpdate {
            feed: Feed::OrderUpdates,
            event: FeedEvent::Order(OrderEvent {
                id: 5,
                status: Some("Chờ duyệt".to_string()),
                customer_name: None,
                order_date: None,
                final_amount: None,
                message: None,
            }),
            changed: vec![5],
        });

        let seen = seen.lock().clone().unwrap();
        assert_eq!(seen.0, vec![5]);
        assert_eq!(seen.1, Feed::OrderUpdates);
    }
}
