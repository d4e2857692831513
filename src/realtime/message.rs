//! Feed wire schema - envelope and domain event bodies
//!
//! Every frame received from a feed parses into a `FeedEnvelope` first
//! (`ping` / `pong` / `domain-event` discriminated by the `type` tag);
//! domain-event bodies stay raw until the per-feed typed decode. The
//! transport guarantees no sequence numbers or timestamps, so nothing
//! here assumes ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::RealtimeError;

// ============================================================================
// FEEDS
// ============================================================================

/// Logical realtime feeds, each multiplexed over one physical connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    /// Order snapshots pushed to staff/admin dashboards
    OrderUpdates,
    /// Per-customer status notes
    OrderStatus,
    /// Table occupancy mutations (the only feed that heartbeats)
    TableUpdates,
}

impl Feed {
    /// Feed code string (used in logs)
    pub fn code(&self) -> &'static str {
        match self {
            Feed::OrderUpdates => "orders.updates",
            Feed::OrderStatus => "orders.status",
            Feed::TableUpdates => "tables.updates",
        }
    }

    /// Endpoint path relative to the WS base URL
    pub fn path(&self) -> &'static str {
        match self {
            Feed::OrderUpdates => "/ws/orders/updates/",
            Feed::OrderStatus => "/ws/orders/status/",
            Feed::TableUpdates => "/ws/tables/updates/",
        }
    }

    /// Parse feed from code string
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "orders.updates" => Some(Feed::OrderUpdates),
            "orders.status" => Some(Feed::OrderStatus),
            "tables.updates" => Some(Feed::TableUpdates),
            _ => None,
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// ENVELOPE
// ============================================================================

/// Parsed unit of data received from a feed, before domain interpretation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FeedEnvelope {
    /// Keepalive sent by this client on heartbeating feeds
    Ping,

    /// Keepalive reply; consumed inside the channel, never forwarded
    Pong,

    /// Feed-specific body, decoded per feed by `FeedEvent::decode`
    DomainEvent(serde_json::Value),
}

impl FeedEnvelope {
    /// Serialize to wire text
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// DOMAIN EVENT BODIES
// ============================================================================

/// Order snapshot pushed on the order-updates feed
///
/// Only `id` is guaranteed; every other field may be absent and absent
/// fields must not clobber known state during reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Status note pushed on the per-customer order-status feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusNote {
    pub customer_phone: String,
    pub message: String,
}

/// Occupancy mutation pushed on the table-updates feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEvent {
    pub table_id: u64,
    pub action: TableAction,
    pub customer: CustomerRef,
}

/// What happened to the table's occupant set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableAction {
    CustomerAssigned,
    CustomerRemoved,
}

/// Customer reference carried by table events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRef {
    pub phone: String,
}

// ============================================================================
// TYPED EVENTS
// ============================================================================

/// A domain event after per-feed typed decode
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Order(OrderEvent),
    Status(StatusNote),
    Table(TableEvent),
}

impl FeedEvent {
    /// Decode a domain-event body for the feed it arrived on
    pub fn decode(feed: Feed, body: serde_json::Value) -> Result<Self, RealtimeError> {
        let decoded = match feed {
            Feed::OrderUpdates => serde_json::from_value(body).map(FeedEvent::Order),
            Feed::OrderStatus => serde_json::from_value(body).map(FeedEvent::Status),
            Feed::TableUpdates => serde_json::from_value(body).map(FeedEvent::Table),
        };
        decoded.map_err(RealtimeError::from)
    }
}
