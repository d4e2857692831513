//! Topic multiplexer
//!
//! Maps each logical feed to exactly one channel, shared by every
//! subscriber of that feed. The first subscriber opens the channel;
//! the last one out closes it with the normal code so no reconnect is
//! scheduled. Between the two sits the per-feed pump: envelope in,
//! reconcile, fan out - one synchronous turn per event, preserving the
//! channel's receipt order.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::RealtimeConfig;
use crate::logger::{self, LogTag};
use crate::realtime::backoff::{ExhaustPolicy, ReconnectPolicy};
use crate::realtime::channel::{Channel, ChannelConfig, ChannelHandle, ChannelState};
use crate::realtime::message::{Feed, FeedEnvelope, FeedEvent};
use crate::realtime::reconciler::Reconciler;
use crate::realtime::registry::{Disposer, FeedCallback, FeedUpdate, SubscriberRegistry};

// ============================================================================
// SUBSCRIPTION
// ============================================================================

/// A live registration on one feed
///
/// Dropping the subscription disposes it; disposal is idempotent and
/// detaches the callback for good.
pub struct Subscription {
    status_rx: watch::Receiver<ChannelState>,
    disposer: Disposer,
}

impl Subscription {
    /// Subscription that never connected and has nothing to tear down.
    /// Handed out when a gate (identity, permission) rules the feed out
    /// up front.
    pub(crate) fn inert() -> Self {
        Self {
            status_rx: watch::channel(ChannelState::Disconnected).1,
            disposer: Disposer::noop(),
        }
    }

    /// Current connection status of the underlying feed channel
    pub fn status(&self) -> ChannelState {
        *self.status_rx.borrow()
    }

    /// Watcher over status transitions
    pub fn watch_status(&self) -> watch::Receiver<ChannelState> {
        self.status_rx.clone()
    }

    /// Detach the callback; tears the channel down if this was the last
    /// subscriber on the feed
    pub fn dispose(&self) {
        self.disposer.dispose();
    }
}

// ============================================================================
// MULTIPLEXER
// ============================================================================

struct FeedEntry {
    handle: ChannelHandle,
    _pump: JoinHandle<()>,
}

/// One channel per feed, shared across consumers
pub struct FeedMultiplexer {
    config: RealtimeConfig,
    reconciler: Arc<Reconciler>,
    registry: Arc<SubscriberRegistry>,
    feeds: Mutex<HashMap<Feed, FeedEntry>>,
}

impl FeedMultiplexer {
    pub fn new(config: RealtimeConfig, reconciler: Arc<Reconciler>) -> Arc<Self> {
        Arc::new(Self {
            config,
            reconciler,
            registry: Arc::new(SubscriberRegistry::new()),
            feeds: Mutex::new(HashMap::new()),
        })
    }

    /// Reconciled state shared with subscribers
    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Attach a callback to a feed, opening the channel if this is the
    /// first subscriber. An entry whose channel task has terminated
    /// (gave up, or the server ended the session normally) is stale and
    /// gets replaced here - subscribing again is the manual retry.
    ///
    /// Registration happens under the feeds lock so that a concurrent
    /// last-subscriber teardown in `release` cannot interleave with it.
    pub fn subscribe(self: &Arc<Self>, feed: Feed, callback: FeedCallback) -> Subscription {
        let (id, status_rx) = {
            let mut feeds = self.feeds.lock();
            let id = self.registry.register(feed, callback);

            let reopen = match feeds.get(&feed) {
                None => true,
                Some(entry)
                    if entry.handle.state() == ChannelState::Failed
                        || entry.handle.is_finished() =>
                {
                    entry.handle.close();
                    true
                }
                Some(_) => false,
            };
            if reopen {
                feeds.insert(feed, self.open_feed(feed));
            }
            // Entry guaranteed present; fall back to a dead watcher only
            // if something removed it concurrently
            let status_rx = match feeds.get(&feed) {
                Some(entry) => entry.handle.watch_state(),
                None => watch::channel(ChannelState::Disconnected).1,
            };
            (id, status_rx)
        };

        let mux = Arc::downgrade(self);
        let disposer = Disposer::new(move || {
            if let Some(mux) = mux.upgrade() {
                mux.release(feed, id);
            }
        });

        Subscription {
            status_rx,
            disposer,
        }
    }

    /// Number of feeds with an open channel
    pub fn open_feeds(&self) -> usize {
        self.feeds.lock().len()
    }

    /// Deregistration and the teardown decision share the feeds lock
    /// with `subscribe`: a registration racing this release either lands
    /// before the count is read (keeping the channel alive) or after the
    /// entry is gone (opening a fresh one). It can never be left holding
    /// a closed channel.
    fn release(&self, feed: Feed, id: u64) {
        let mut feeds = self.feeds.lock();
        let remaining = self.registry.deregister(feed, id);
        if remaining == 0 {
            if let Some(entry) = feeds.remove(&feed) {
                logger::info(
                    LogTag::Feed,
                    &format!("{}: last subscriber left, closing channel", feed),
                );
                // Normal close code: the channel schedules no reconnect
                // and the pump drains out on its own
                entry.handle.close();
            }
        }
    }

    fn open_feed(&self, feed: Feed) -> FeedEntry {
        logger::info(
            LogTag::Feed,
            &format!("{}: first subscriber, opening channel", feed),
        );

        let (handle, events_rx) = Channel::open(self.channel_config(feed));
        let pump = spawn_pump(
            feed,
            events_rx,
            self.reconciler.clone(),
            self.registry.clone(),
        );

        FeedEntry {
            handle,
            _pump: pump,
        }
    }

    /// Per-feed wiring: reconnect tuning, exhaustion behavior and
    /// heartbeat. The exhaustion asymmetry (order feeds give up, the
    /// table feed retries forever) is deliberate product behavior.
    fn channel_config(&self, feed: Feed) -> ChannelConfig {
        let (settings, on_exhaust, heartbeat) = match feed {
            Feed::OrderUpdates => (
                self.config.order_updates.clone(),
                ExhaustPolicy::GiveUp,
                None,
            ),
            Feed::OrderStatus => (
                self.config.order_status.clone(),
                ExhaustPolicy::GiveUp,
                None,
            ),
            Feed::TableUpdates => (
                self.config.table_updates.clone(),
                ExhaustPolicy::ResetAndRetry,
                Some(Duration::from_secs(self.config.heartbeat_secs)),
            ),
        };

        ChannelConfig {
            feed,
            url: self.config.ws_url(feed.path()),
            policy: ReconnectPolicy::new(settings, on_exhaust),
            heartbeat,
        }
    }
}

/// Pump raw envelopes through reconciliation and out to subscribers.
/// Runs until the channel drops its sender (shutdown or teardown).
fn spawn_pump(
    feed: Feed,
    mut events_rx: mpsc::UnboundedReceiver<FeedEnvelope>,
    reconciler: Arc<Reconciler>,
    registry: Arc<SubscriberRegistry>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(envelope) = events_rx.recv().await {
            let FeedEnvelope::DomainEvent(body) = envelope else {
                // Stray control envelope; pongs never get this far
                continue;
            };
            match FeedEvent::decode(feed, body) {
                Ok(event) => {
                    let changed = reconciler.apply(&event);
                    registry.dispatch(&FeedUpdate {
                        feed,
                        event,
                        changed,
                    });
                }
                Err(err) => {
                    logger::warning(
                        LogTag::Feed,
                        &format!("{}: undecodable domain event: {}", feed, err),
                    );
                }
            }
        }
        logger::debug(LogTag::Feed, &format!("{}: pump drained", feed));
    })
}
