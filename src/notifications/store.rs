//! Notification store
//!
//! Newest-first list plus a cached unread counter. The counter is the
//! hot path for badge rendering, so it is maintained incrementally and
//! only moves on genuine unread/read transitions. Invariant: it always
//! equals the number of items with `read == false`.

use parking_lot::Mutex;

use crate::logger::{self, LogTag};

use super::types::Notification;

#[derive(Default)]
struct Inner {
    items: Vec<Notification>,
    unread: usize,
}

pub struct NotificationStore {
    inner: Mutex<Inner>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Insert at the head. A notification whose id is already present is
    /// dropped silently; upstream dedup makes this rare but reconnect
    /// replays can still hand us the same order twice.
    pub fn add(&self, notification: Notification) {
        let mut inner = self.inner.lock();
        if inner.items.iter().any(|item| item.id == notification.id) {
            logger::debug(
                LogTag::Notify,
                &format!("duplicate notification {} ignored", notification.id),
            );
            return;
        }
        if !notification.read {
            inner.unread += 1;
        }
        inner.items.insert(0, notification);
    }

    /// Mark one notification read; counts down only on an actual
    /// unread-to-read transition
    pub fn mark_as_read(&self, id: u64) {
        let mut inner = self.inner.lock();
        let mut flipped = false;
        if let Some(item) = inner.items.iter_mut().find(|item| item.id == id) {
            if !item.read {
                item.read = true;
                flipped = true;
            }
        }
        if flipped {
            inner.unread -= 1;
        }
    }

    pub fn mark_all_as_read(&self) {
        let mut inner = self.inner.lock();
        for item in inner.items.iter_mut() {
            item.read = true;
        }
        inner.unread = 0;
    }

    /// Drop a notification; an unread one also decrements the counter
    pub fn remove(&self, id: u64) {
        let mut inner = self.inner.lock();
        let Some(index) = inner.items.iter().position(|item| item.id == id) else {
            return;
        };
        let removed = inner.items.remove(index);
        if !removed.read {
            inner.unread -= 1;
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.items.clear();
        inner.unread = 0;
    }

    pub fn unread_count(&self) -> usize {
        self.inner.lock().unread
    }

    /// Snapshot of the list, newest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.lock().items.clone()
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}
