//! Notification records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::orders::OrderStatus;
use crate::realtime::message::OrderEvent;

/// An in-app alert produced from a feed event
///
/// Identity follows the originating entity: a new-order alert reuses the
/// order id, which is what makes re-delivered events collapse into one
/// notification instead of piling up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    /// Raw event body for consumers that want to deep-link
    pub payload: Value,
}

impl Notification {
    /// Alert for a freshly created order
    pub fn new_order(order: &OrderEvent) -> Self {
        let status = order
            .status
            .as_deref()
            .unwrap_or(OrderStatus::Pending.as_str());
        let amount = order.final_amount.unwrap_or(0.0);

        Self {
            id: order.id,
            title: "Đơn hàng mới".to_string(),
            message: format!(
                "Đơn hàng #{} - {}\nTổng tiền: {} VND",
                order.id,
                status,
                format_vnd(amount)
            ),
            timestamp: Utc::now(),
            read: false,
            payload: serde_json::to_value(order).unwrap_or(Value::Null),
        }
    }
}

/// VND amounts display with vi-VN thousands grouping ("185.000"), no
/// fractional part (the backend only deals in whole đồng)
fn format_vnd(amount: f64) -> String {
    let whole = amount.round() as i64;
    let digits = whole.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if whole < 0 {
        grouped.push('-');
    }
    let lead = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - lead) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}
