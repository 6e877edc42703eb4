//! Domain layer for the order-placement system.
//!
//! This crate provides:
//! - request validation (pure, no I/O)
//! - the inventory transaction coordinator, which places an order and
//!   decrements stock as one atomic unit of work
//! - the error taxonomy with outcome classification for response shaping

pub mod coordinator;
pub mod error;
pub mod validate;

pub use coordinator::{OrderPlacement, PlacedOrder};
pub use error::{ErrorClass, PlaceOrderError};
pub use validate::{CreateOrderRequest, PlacementRequest, ValidationError, validate};
