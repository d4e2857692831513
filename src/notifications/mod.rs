//! In-app notifications produced from real-time feed events

pub mod store;
pub mod types;

pub use store::NotificationStore;
pub use types::Notification;
