//! Order lifecycle events and their publishers.
//!
//! Publishing is decoupled from the placement transaction: events are
//! emitted only after a successful commit, and delivery is best-effort —
//! a failed publish never invalidates a committed order.

pub mod event;
pub mod publisher;

pub use event::OrderCreated;
pub use publisher::{EventPublisher, InMemoryEventPublisher, LoggingEventPublisher, PublishError};
