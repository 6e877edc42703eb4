//! Request validation for order placement.

use common::{ProductId, UserId};
use serde::Deserialize;
use thiserror::Error;

/// Raw order-creation payload as received from a client.
///
/// Every field is optional at the serde level so that missing fields
/// surface as [`ValidationError`]s rather than deserialization failures.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
    pub user_id: Option<String>,
}

/// Validation failures for incoming order requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Quantity must be a positive integer, got {0}")]
    InvalidQuantity(i64),
}

/// A validated, normalized order request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub user_id: UserId,
}

/// Checks shape and required fields of a raw request.
///
/// An omitted quantity means a single unit. No side effects.
pub fn validate(payload: CreateOrderRequest) -> Result<PlacementRequest, ValidationError> {
    let product_id = match payload.product_id {
        Some(id) if !id.trim().is_empty() => ProductId::new(id),
        _ => return Err(ValidationError::MissingField("productId")),
    };

    let user_id = match payload.user_id {
        Some(id) if !id.trim().is_empty() => UserId::new(id),
        _ => return Err(ValidationError::MissingField("userId")),
    };

    let quantity = match payload.quantity {
        None => 1,
        Some(q) => u32::try_from(q)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(ValidationError::InvalidQuantity(q))?,
    };

    Ok(PlacementRequest {
        product_id,
        quantity,
        user_id,
    })
}
