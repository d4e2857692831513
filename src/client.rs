//! Consumer-facing facade
//!
//! One `RealtimeClient` per logged-in session. It owns the multiplexer,
//! the reconciled state and the notification store, and exposes
//! domain-shaped subscriptions on top of the raw feed plumbing:
//! identity and permission gates live here, not in the transport.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::RealtimeConfig;
use crate::errors::RealtimeError;
use crate::logger::{self, LogTag};
use crate::notifications::{Notification, NotificationStore};
use crate::realtime::message::{Feed, FeedEvent, StatusNote};
use crate::realtime::multiplexer::{FeedMultiplexer, Subscription};
use crate::realtime::reconciler::{OrderRecord, Reconciler, TableRecord};
use crate::realtime::registry::FeedUpdate;
use crate::session::{Session, PERM_MANAGE_ORDERS};

// ============================================================================
// NEW-ORDER FILTER
// ============================================================================

/// Tracks order ids already sighted so reconnect replays and plain
/// status updates do not re-alert
struct NewOrderFilter {
    seen: Mutex<HashSet<u64>>,
}

impl NewOrderFilter {
    fn preloaded(known: impl IntoIterator<Item = u64>) -> Self {
        Self {
            seen: Mutex::new(known.into_iter().collect()),
        }
    }

    /// True exactly once per order id
    fn first_sighting(&self, id: u64) -> bool {
        self.seen.lock().insert(id)
    }
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct RealtimeClient {
    mux: Arc<FeedMultiplexer>,
    reconciler: Arc<Reconciler>,
    notifications: Arc<NotificationStore>,
    session: Session,
}

impl RealtimeClient {
    pub fn new(config: RealtimeConfig, session: Session) -> Result<Self, RealtimeError> {
        config.validate()?;
        let reconciler = Arc::new(Reconciler::new());
        let mux = FeedMultiplexer::new(config, reconciler.clone());
        Ok(Self {
            mux,
            reconciler,
            notifications: Arc::new(NotificationStore::new()),
            session,
        })
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// All order create/update events, with the reconciled collection
    /// kept current underneath
    pub fn subscribe_orders(
        &self,
        on_update: impl Fn(&FeedUpdate) + Send + Sync + 'static,
    ) -> Subscription {
        self.mux.subscribe(Feed::OrderUpdates, Arc::new(on_update))
    }

    /// Table occupancy events
    pub fn subscribe_table_updates(
        &self,
        on_update: impl Fn(&FeedUpdate) + Send + Sync + 'static,
    ) -> Subscription {
        self.mux.subscribe(Feed::TableUpdates, Arc::new(on_update))
    }

    /// Status notes addressed to the session's own phone number.
    /// Sessions without a customer identity get an inert subscription:
    /// there is nothing on this feed for them.
    pub fn subscribe_order_status(
        &self,
        on_note: impl Fn(&StatusNote) + Send + Sync + 'static,
    ) -> Subscription {
        let Some(phone) = self.session.customer_phone.clone() else {
            logger::debug(
                LogTag::Feed,
                "order-status subscription skipped: no customer identity",
            );
            return Subscription::inert();
        };

        self.mux.subscribe(
            Feed::OrderStatus,
            Arc::new(move |update: &FeedUpdate| {
                if let FeedEvent::Status(note) = &update.event {
                    if note.customer_phone == phone {
                        on_note(note);
                    }
                }
            }),
        )
    }

    /// Admin alerts for newly arrived orders, landed in the shared
    /// notification store. Requires the `manage_orders` permission;
    /// orders already present at subscription time never alert.
    pub fn subscribe_order_alerts(&self) -> Subscription {
        if !self.session.has_permission(PERM_MANAGE_ORDERS) {
            logger::debug(
                LogTag::Notify,
                "order alerts skipped: manage_orders not granted",
            );
            return Subscription::inert();
        }

        let filter = NewOrderFilter::preloaded(
            self.reconciler.orders().iter().map(|order| order.id),
        );
        let store = self.notifications.clone();

        self.mux.subscribe(
            Feed::OrderUpdates,
            Arc::new(move |update: &FeedUpdate| {
                let FeedEvent::Order(order) = &update.event else {
                    return;
                };
                if filter.first_sighting(order.id) {
                    store.add(Notification::new_order(order));
                }
            }),
        )
    }

    // ------------------------------------------------------------------
    // Reconciled state
    // ------------------------------------------------------------------

    /// Newest-first snapshot of the reconciled orders
    pub fn orders(&self) -> Vec<OrderRecord> {
        self.reconciler.orders()
    }

    pub fn order(&self, id: u64) -> Option<OrderRecord> {
        self.reconciler.order(id)
    }

    pub fn tables(&self) -> Vec<TableRecord> {
        self.reconciler.tables()
    }

    pub fn table(&self, id: u64) -> Option<TableRecord> {
        self.reconciler.table(id)
    }

    /// Prime the order collection from an initial fetch, before (or
    /// instead of) live events
    pub fn seed_orders(&self, orders: Vec<OrderRecord>) {
        self.reconciler.seed_orders(orders);
    }

    pub fn seed_tables(&self, tables: Vec<TableRecord>) {
        self.reconciler.seed_tables(tables);
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.notifications()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.unread_count()
    }

    pub fn mark_notification_read(&self, id: u64) {
        self.notifications.mark_as_read(id);
    }

    pub fn mark_all_notifications_read(&self) {
        self.notifications.mark_all_as_read();
    }

    pub fn dismiss_notification(&self, id: u64) {
        self.notifications.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedSettings;
    use crate::realtime::testutil::spawn_listener;
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Duration, Instant};
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    fn fast_config(api_url: String) -> RealtimeConfig {
        let fast = FeedSettings {
            max_attempts: 3,
            base_delay_ms: 20,
            growth: 1.5,
            max_delay_ms: 100,
        };
        RealtimeConfig {
            api_url,
            heartbeat_secs: 60,
            order_updates: fast.clone(),
            order_status: fast.clone(),
            table_updates: fast,
        }
    }

    async fn wait_until(check: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_millis(2_000);
        while !check() {
            assert!(Instant::now() < deadline, "condition never held");
            sleep(Duration::from_millis(10)).await;
        }
    }

    #[test]
    fn test_new_order_filter_fires_once_per_id() {
        let filter = NewOrderFilter::preloaded([1, 2]);
        assert!(!filter.first_sighting(1), "preloaded id is not new");
        assert!(filter.first_sighting(3));
        assert!(!filter.first_sighting(3), "second sighting is not new");
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let mut config = fast_config("http://localhost:8000".to_string());
        config.order_updates.growth = 0.5;
        assert!(RealtimeClient::new(config, Session::anonymous()).is_err());
    }

    #[tokio::test]
    async fn test_alerts_require_manage_orders() {
        let config = fast_config("http://127.0.0.1:1".to_string());
        let client = RealtimeClient::new(config, Session::customer("0900000001")).unwrap();

        let sub = client.subscribe_order_alerts();
        assert_eq!(sub.status().as_str(), "disconnected");
        // No channel was opened for the gated subscription
        assert_eq!(client.mux.open_feeds(), 0);
    }

    #[tokio::test]
    async fn test_status_subscription_needs_customer_identity() {
        let config = fast_config("http://127.0.0.1:1".to_string());
        let client = RealtimeClient::new(config, Session::anonymous()).unwrap();

        let _sub = client.subscribe_order_status(|_| {});
        assert_eq!(client.mux.open_feeds(), 0);
    }

    #[tokio::test]
    async fn test_order_alerts_land_in_the_store() {
        let (listener, _url, _accepts) = spawn_listener().await;
        let addr_url = format!("http://{}", listener.inner_addr());

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            // Same order twice: creation, then a status change
            ws.send(Message::Text(
                json!({"type": "domain-event", "id": 31, "status": "Chờ duyệt", "final_amount": 99000.0})
                    .to_string(),
            ))
            .await
            .unwrap();
            ws.send(Message::Text(
                json!({"type": "domain-event", "id": 31, "status": "Đã duyệt"}).to_string(),
            ))
            .await
            .unwrap();
            while ws.next().await.is_some() {}
        });

        let session = Session::staff(vec![PERM_MANAGE_ORDERS.to_string()]);
        let client = RealtimeClient::new(fast_config(addr_url), session).unwrap();
        let _sub = client.subscribe_order_alerts();

        wait_until(|| client.unread_count() == 1).await;
        // Second event merged into state but did not re-alert
        wait_until(|| {
            client.order(31).and_then(|o| o.status) == Some("Đã duyệt".to_string())
        })
        .await;
        assert_eq!(client.notifications().len(), 1);
        assert_eq!(client.notifications()[0].title, "Đơn hàng mới");
    }

    #[tokio::test]
    async fn test_seeded_orders_do_not_alert() {
        let (listener, _url, _accepts) = spawn_listener().await;
        let addr_url = format!("http://{}", listener.inner_addr());

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(Message::Text(
                json!({"type": "domain-event", "id": 1, "status": "Đã duyệt"}).to_string(),
            ))
            .await
            .unwrap();
            ws.send(Message::Text(
                json!({"type": "domain-event", "id": 2, "status": "Chờ duyệt"}).to_string(),
            ))
            .await
            .unwrap();
            while ws.next().await.is_some() {}
        });

        let session = Session::staff(vec![PERM_MANAGE_ORDERS.to_string()]);
        let client = RealtimeClient::new(fast_config(addr_url), session).unwrap();
        client.seed_orders(vec![OrderRecord {
            id: 1,
            status: Some("Chờ duyệt".to_string()),
            customer_name: None,
            order_date: None,
            final_amount: None,
        }]);
        let _sub = client.subscribe_order_alerts();

        wait_until(|| client.unread_count() == 1).await;
        // Only the genuinely new order alerted
        assert_eq!(client.notifications()[0].id, 2);
    }

    #[tokio::test]
    async fn test_status_notes_filtered_by_own_phone() {
        let (listener, _url, _accepts) = spawn_listener().await;
        let addr_url = format!("http://{}", listener.inner_addr());

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(Message::Text(
                json!({
                    "type": "domain-event",
                    "customer_phone": "0911111111",
                    "message": "Đơn hàng #5 - Đang giao"
                })
                .to_string(),
            ))
            .await
            .unwrap();
            ws.send(Message::Text(
                json!({
                    "type": "domain-event",
                    "customer_phone": "0900000001",
                    "message": "Đơn hàng #6 - Đã giao"
                })
                .to_string(),
            ))
            .await
            .unwrap();
            while ws.next().await.is_some() {}
        });

        let client = RealtimeClient::new(
            fast_config(addr_url),
            Session::customer("0900000001"),
        )
        .unwrap();

        let delivered = Arc::new(AtomicUsize::new(0));
        let _sub = {
            let delivered = delivered.clone();
            client.subscribe_order_status(move |note: &StatusNote| {
                assert_eq!(note.customer_phone, "0900000001");
                delivered.fetch_add(1, Ordering::SeqCst);
            })
        };

        wait_until(|| delivered.load(Ordering::SeqCst) == 1).await;
        // Give the foreign note time to prove it stays filtered
        sleep(Duration::from_millis(100)).await;
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }
}
