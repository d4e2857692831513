//! Order lifecycle state machine
//!
//! `Chờ duyệt → Đã duyệt → Đang giao → Đã giao`, with cancellation
//! (`Đã hủy`) reachable from any non-terminal state. This graph is
//! enforced where mutations originate (the HTTP status update path);
//! the reconciler deliberately accepts whatever status string arrives,
//! because rejecting "unexpected" transitions would drop legitimate
//! late-arriving updates.

use serde::{Deserialize, Serialize};

/// Order status as displayed and persisted by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Chờ duyệt - awaiting approval
    #[serde(rename = "Chờ duyệt")]
    Pending,

    /// Đã duyệt - approved
    #[serde(rename = "Đã duyệt")]
    Approved,

    /// Đang giao - out for delivery
    #[serde(rename = "Đang giao")]
    Delivering,

    /// Đã giao - delivered (terminal)
    #[serde(rename = "Đã giao")]
    Delivered,

    /// Đã hủy - cancelled (terminal)
    #[serde(rename = "Đã hủy")]
    Cancelled,
}

impl OrderStatus {
    /// Backend display string
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Chờ duyệt",
            OrderStatus::Approved => "Đã duyệt",
            OrderStatus::Delivering => "Đang giao",
            OrderStatus::Delivered => "Đã giao",
            OrderStatus::Cancelled => "Đã hủy",
        }
    }

    /// Parse a backend status string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Chờ duyệt" => Some(OrderStatus::Pending),
            "Đã duyệt" => Some(OrderStatus::Approved),
            "Đang giao" => Some(OrderStatus::Delivering),
            "Đã giao" => Some(OrderStatus::Delivered),
            "Đã hủy" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Next state in the fixed linear sequence; terminal states (and
    /// cancelled orders) stay where they are. There is no skip-ahead.
    pub fn next(&self) -> OrderStatus {
        match self {
            OrderStatus::Pending => OrderStatus::Approved,
            OrderStatus::Approved => OrderStatus::Delivering,
            OrderStatus::Delivering => OrderStatus::Delivered,
            OrderStatus::Delivered => OrderStatus::Delivered,
            OrderStatus::Cancelled => OrderStatus::Cancelled,
        }
    }

    /// Delivered and cancelled orders never change state again
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Cancellation is reachable from any non-terminal state and is
    /// irreversible
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
