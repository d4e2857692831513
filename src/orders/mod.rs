//! Order domain types shared by the realtime core and its consumers

pub mod status;

pub use status::OrderStatus;
