//! Shared value objects for the order-placement system.

pub mod types;

pub use types::{Money, OrderId, ProductId, UserId};
