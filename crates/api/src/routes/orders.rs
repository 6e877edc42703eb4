//! Order placement endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use domain::{CreateOrderRequest, OrderPlacement};
use events::EventPublisher;
use inventory_store::InventoryStore;
use serde::Serialize;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: InventoryStore, P: EventPublisher> {
    pub placement: OrderPlacement<S, P>,
}

impl<S: InventoryStore, P: EventPublisher> AppState<S, P> {
    /// Creates state wrapping a placement coordinator over the given
    /// store and publisher.
    pub fn new(store: S, publisher: P) -> Self {
        Self {
            placement: OrderPlacement::new(store, publisher),
        }
    }
}

/// Response for a successfully created order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedResponse {
    pub order_id: String,
    pub status: String,
    pub message: String,
}

/// POST /orders — place an order against the inventory pool.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S, P>(
    State(state): State<Arc<AppState<S, P>>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError>
where
    S: InventoryStore + 'static,
    P: EventPublisher + 'static,
{
    // An absent or unparseable body is a validation failure, not a 422.
    let Json(request) =
        payload.map_err(|e| ApiError::BadRequest(format!("Missing order data: {e}")))?;

    let placed = state.placement.place_order(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            order_id: placed.order_id.to_string(),
            status: placed.status.to_string(),
            message: "Order successfully created".to_string(),
        }),
    ))
}
