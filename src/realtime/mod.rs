//! Real-time transport layer
//!
//! Everything between the raw WebSocket and the consumer-facing client:
//! per-feed channels with reconnect and heartbeat, the multiplexer that
//! shares one channel per feed, the reconciler holding canonical state,
//! and the subscriber registry that fans updates out.

pub mod backoff;
pub mod channel;
pub mod message;
pub mod multiplexer;
pub mod reconciler;
pub mod registry;

#[cfg(test)]
pub(crate) mod testutil;

pub use backoff::{ExhaustPolicy, ReconnectDecision, ReconnectPolicy};
pub use channel::{Channel, ChannelConfig, ChannelHandle, ChannelState};
pub use message::{
    CustomerRef, Feed, FeedEnvelope, FeedEvent, OrderEvent, StatusNote, TableAction, TableEvent,
};
pub use multiplexer::{FeedMultiplexer, Subscription};
pub use reconciler::{EntityId, OrderRecord, Reconciler, TableRecord};
pub use registry::{Disposer, FeedCallback, FeedUpdate, SubscriberId, SubscriberRegistry};
