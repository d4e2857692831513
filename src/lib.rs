//! tablelink - real-time update core for a restaurant point-of-sale
//!
//! Keeps a client's view of orders, tables and notifications current by
//! multiplexing three WebSocket feeds, reconciling their events into
//! canonical collections and fanning changes out to subscribers.

pub mod client;
pub mod config;
pub mod errors;
pub mod logger;
pub mod notifications;
pub mod orders;
pub mod realtime;
pub mod session;

pub use client::RealtimeClient;
pub use config::{FeedSettings, RealtimeConfig};
pub use errors::RealtimeError;
pub use notifications::{Notification, NotificationStore};
pub use orders::OrderStatus;
pub use realtime::{ChannelState, Feed, FeedEvent, Subscription};
pub use session::Session;
