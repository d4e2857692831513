//! Canonical state reconciliation
//!
//! Owns the canonical order and table collections and merges incoming
//! feed events into them. The transport is at-least-once with no
//! ordering guarantees, so every merge here is idempotent and tolerant
//! of duplicates, partial bodies and unknown ids. Status strings are
//! accepted as-is: validating them against the lifecycle graph would
//! drop legitimate late-arriving updates.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::logger::{self, LogTag};
use crate::realtime::message::{FeedEvent, OrderEvent, TableAction, TableEvent};

/// Identity of a reconciled entity (order id or table id)
pub type EntityId = u64;

// ============================================================================
// RECORDS
// ============================================================================

/// Canonical order, newest-first in the reconciled collection
///
/// Orders are never deleted by this subsystem; cancellation is a status
/// transition, not removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub order_date: Option<String>,
    #[serde(default)]
    pub final_amount: Option<f64>,
}

impl OrderRecord {
    /// Shallow-merge fields the event carries, preserving the rest.
    /// Returns true when anything actually changed.
    fn merge(&mut self, event: &OrderEvent) -> bool {
        let mut changed = false;
        if let Some(status) = &event.status {
            if self.status.as_deref() != Some(status) {
                self.status = Some(status.clone());
                changed = true;
            }
        }
        if let Some(name) = &event.customer_name {
            if self.customer_name.as_deref() != Some(name) {
                self.customer_name = Some(name.clone());
                changed = true;
            }
        }
        if let Some(date) = &event.order_date {
            if self.order_date.as_deref() != Some(date) {
                self.order_date = Some(date.clone());
                changed = true;
            }
        }
        if let Some(amount) = event.final_amount {
            if self.final_amount != Some(amount) {
                self.final_amount = Some(amount);
                changed = true;
            }
        }
        changed
    }
}

impl From<&OrderEvent> for OrderRecord {
    fn from(event: &OrderEvent) -> Self {
        Self {
            id: event.id,
            status: event.status.clone(),
            customer_name: event.customer_name.clone(),
            order_date: event.order_date.clone(),
            final_amount: event.final_amount,
        }
    }
}

/// Canonical table with its occupant set (customer phone numbers)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub id: u64,
    #[serde(default)]
    pub occupants: Vec<String>,
}

impl TableRecord {
    fn new(id: u64) -> Self {
        Self {
            id,
            occupants: Vec::new(),
        }
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

/// Sole owner of the canonical order/table collections
///
/// Mutated only by the feed pump; readers always observe fully-applied
/// mutations because dispatch to subscribers happens after the lock is
/// released.
pub struct Reconciler {
    orders: RwLock<Vec<OrderRecord>>,
    tables: RwLock<Vec<TableRecord>>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(Vec::new()),
            tables: RwLock::new(Vec::new()),
        }
    }

    /// Merge one decoded event into canonical state and report the ids
    /// whose state actually changed (duplicate no-ops report nothing)
    pub fn apply(&self, event: &FeedEvent) -> Vec<EntityId> {
        match event {
            FeedEvent::Order(order) => self.apply_order(order),
            FeedEvent::Table(table) => self.apply_table(table),
            // Status notes carry no canonical state; they go straight to
            // the consumer filter
            FeedEvent::Status(_) => Vec::new(),
        }
    }

    fn apply_order(&self, event: &OrderEvent) -> Vec<EntityId> {
        let mut orders = self.orders.write();

        if let Some(record) = orders.iter_mut().find(|o| o.id == event.id) {
            if record.merge(event) {
                logger::debug(
                    LogTag::Reconcile,
                    &format!("order {} merged", event.id),
                );
                vec![event.id]
            } else {
                Vec::new()
            }
        } else {
            // Unseen id: best-effort insert with whatever fields arrived,
            // newest-first
            orders.insert(0, OrderRecord::from(event));
            logger::debug(
                LogTag::Reconcile,
                &format!("order {} inserted", event.id),
            );
            vec![event.id]
        }
    }

    fn apply_table(&self, event: &TableEvent) -> Vec<EntityId> {
        let mut tables = self.tables.write();
        let phone = &event.customer.phone;
        let mut changed = Vec::new();

        match event.action {
            TableAction::CustomerAssigned => {
                // Occupancy invariant: a phone sits at one table at a time
                for table in tables.iter_mut() {
                    if table.id != event.table_id
                        && table.occupants.iter().any(|p| p == phone)
                    {
                        table.occupants.retain(|p| p != phone);
                        changed.push(table.id);
                    }
                }

                let idx = match tables.iter().position(|t| t.id == event.table_id) {
                    Some(idx) => idx,
                    None => {
                        tables.push(TableRecord::new(event.table_id));
                        tables.len() - 1
                    }
                };
                let table = &mut tables[idx];
                if !table.occupants.iter().any(|p| p == phone) {
                    table.occupants.push(phone.clone());
                    changed.push(event.table_id);
                }
            }
            TableAction::CustomerRemoved => {
                if let Some(table) = tables.iter_mut().find(|t| t.id == event.table_id) {
                    let before = table.occupants.len();
                    table.occupants.retain(|p| p != phone);
                    if table.occupants.len() != before {
                        changed.push(event.table_id);
                    }
                }
            }
        }

        if !changed.is_empty() {
            logger::debug(
                LogTag::Reconcile,
                &format!(
                    "table {} {:?} {} (changed: {:?})",
                    event.table_id, event.action, phone, changed
                ),
            );
        }
        changed
    }

    /// Seed the canonical order collection from an HTTP fetch result
    /// (the external CRUD API); later feed events merge on top
    pub fn seed_orders(&self, seeded: Vec<OrderRecord>) {
        *self.orders.write() = seeded;
    }

    /// Seed the canonical table collection from an HTTP fetch result
    pub fn seed_tables(&self, seeded: Vec<TableRecord>) {
        *self.tables.write() = seeded;
    }

    /// Snapshot of the reconciled orders, newest-first
    pub fn orders(&self) -> Vec<OrderRecord> {
        self.orders.read().clone()
    }

    /// Snapshot of one order
    pub fn order(&self, id: EntityId) -> Option<OrderRecord> {
        self.orders.read().iter().find(|o| o.id == id).cloned()
    }

    /// Snapshot of the reconciled tables
    pub fn tables(&self) -> Vec<TableRecord> {
        self.tables.read().clone()
    }

    /// Snapshot of one table
    pub fn table(&self, id: EntityId) -> Option<TableRecord> {
        self.tables.read().iter().find(|t| t.id == id).cloned()
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}
