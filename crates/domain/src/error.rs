//! Error taxonomy and outcome classification for order placement.

use common::ProductId;
use inventory_store::StoreError;
use thiserror::Error;

use crate::validate::ValidationError;

/// Everything that can go wrong while placing an order.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// The request failed shape validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The referenced product does not exist.
    #[error("Product with ID {product_id} not found")]
    ProductNotFound { product_id: ProductId },

    /// Stock cannot cover the requested quantity.
    #[error(
        "Insufficient stock for product {product_id}. Available: {available}, Requested: {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: u32,
    },

    /// The conditional decrement affected no rows: the stock changed
    /// between the locked read and the write. The caller can retry.
    #[error("Inventory update failed for product {product_id} - stock may have changed")]
    StockConflict { product_id: ProductId },

    /// The store failed beneath us.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Coarse outcome classes used to shape caller-facing responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Client input problem, including unknown products and insufficient
    /// stock. The descriptive message is safe to surface.
    InvalidRequest,
    /// A fair race was lost; the same request can be retried.
    Conflict,
    /// Store-level or unanticipated failure. Details stay in the logs.
    Internal,
}

impl PlaceOrderError {
    /// Classifies this error for response shaping.
    ///
    /// Every variant maps to exactly one class; no control path leaves
    /// the caller without an outcome.
    pub fn class(&self) -> ErrorClass {
        match self {
            PlaceOrderError::Validation(_)
            | PlaceOrderError::ProductNotFound { .. }
            | PlaceOrderError::InsufficientStock { .. } => ErrorClass::InvalidRequest,
            PlaceOrderError::StockConflict { .. }
            | PlaceOrderError::Store(StoreError::LockTimeout { .. }) => ErrorClass::Conflict,
            PlaceOrderError::Store(_) => ErrorClass::Internal,
        }
    }
}
