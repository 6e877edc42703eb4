//! The inventory transaction coordinator.
//!
//! Places an order as one atomic unit of work against the store: lock the
//! product row, verify stock, price the order, insert it, conditionally
//! decrement stock, commit. The `order.created` event is published only
//! after the commit succeeds, outside the transaction boundary.

use std::time::Instant;

use chrono::Utc;
use common::{Money, OrderId};
use events::{EventPublisher, OrderCreated};
use inventory_store::{InventoryStore, OrderRecord, OrderStatus, StoreTx};

use crate::error::PlaceOrderError;
use crate::validate::{self, CreateOrderRequest, PlacementRequest};

/// Outcome of a successfully placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub total_price: Money,
    pub status: OrderStatus,
}

/// Places orders against the shared inventory pool.
///
/// Owns explicit handles to the store and the event publisher; nothing is
/// reached through ambient state, so tests can substitute either side.
pub struct OrderPlacement<S, P> {
    store: S,
    publisher: P,
}

impl<S, P> OrderPlacement<S, P>
where
    S: InventoryStore,
    P: EventPublisher,
{
    /// Creates a new coordinator over the given store and publisher.
    pub fn new(store: S, publisher: P) -> Self {
        Self { store, publisher }
    }

    /// Validates a raw payload, then places the order.
    ///
    /// Validation failures return before any store access.
    #[tracing::instrument(skip(self, payload))]
    pub async fn place_order(
        &self,
        payload: CreateOrderRequest,
    ) -> Result<PlacedOrder, PlaceOrderError> {
        let request = validate::validate(payload)?;
        self.place(request).await
    }

    /// Places a validated order as one atomic unit of work.
    ///
    /// The row lock taken inside the transaction serializes all writers
    /// for the product; the unit of work is closed (committed or rolled
    /// back) on every exit path.
    #[tracing::instrument(
        skip(self, request),
        fields(product_id = %request.product_id, quantity = request.quantity)
    )]
    pub async fn place(&self, request: PlacementRequest) -> Result<PlacedOrder, PlaceOrderError> {
        let started = Instant::now();
        let mut tx = self.store.begin().await?;

        match Self::run(&mut tx, &request).await {
            Ok((placed, event)) => {
                tx.commit().await?;
                metrics::counter!("orders_placed_total").increment(1);
                metrics::histogram!("order_placement_seconds")
                    .record(started.elapsed().as_secs_f64());
                tracing::info!(order_id = %placed.order_id, "order placed");

                // Best-effort: the committed order stands even if the
                // notification is lost.
                if let Err(err) = self.publisher.publish(event).await {
                    tracing::warn!(
                        order_id = %placed.order_id,
                        error = %err,
                        "failed to publish order.created"
                    );
                }

                Ok(placed)
            }
            Err(err) => {
                if let Err(rb_err) = tx.rollback().await {
                    tracing::error!(error = %rb_err, "rollback failed");
                }
                metrics::counter!("orders_rejected_total").increment(1);
                Err(err)
            }
        }
    }

    /// Runs the locked section of the unit of work. Every early return
    /// leaves the transaction uncommitted so the caller rolls it back.
    async fn run(
        tx: &mut S::Tx,
        request: &PlacementRequest,
    ) -> Result<(PlacedOrder, OrderCreated), PlaceOrderError> {
        // Captured once; the same value feeds the availability check and
        // the conditional decrement below.
        let quantity = request.quantity;

        let product = tx.lock_product(&request.product_id).await?.ok_or_else(|| {
            PlaceOrderError::ProductNotFound {
                product_id: request.product_id.clone(),
            }
        })?;

        if product.stock < i64::from(quantity) {
            return Err(PlaceOrderError::InsufficientStock {
                product_id: request.product_id.clone(),
                available: product.stock,
                requested: quantity,
            });
        }

        let order = OrderRecord {
            id: OrderId::new(),
            user_id: request.user_id.clone(),
            product_id: request.product_id.clone(),
            quantity,
            total_price: product.unit_price.multiply(quantity),
            status: OrderStatus::Created,
            created_at: Utc::now(),
        };
        tx.insert_order(&order).await?;

        let affected = tx.decrement_stock(&request.product_id, quantity).await?;
        if affected == 0 {
            // The row lock should have excluded other writers; a failed
            // guard is reported as a lost race, never a silent oversell.
            return Err(PlaceOrderError::StockConflict {
                product_id: request.product_id.clone(),
            });
        }

        let event = OrderCreated {
            order_id: order.id,
            product_id: order.product_id.clone(),
            quantity,
        };
        let placed = PlacedOrder {
            order_id: order.id,
            total_price: order.total_price,
            status: order.status,
        };
        Ok((placed, event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ProductId, UserId};
    use events::InMemoryEventPublisher;
    use inventory_store::{InMemoryInventoryStore, ProductRow};

    async fn seeded(
        products: &[(&str, i64, i64)],
    ) -> (
        OrderPlacement<InMemoryInventoryStore, InMemoryEventPublisher>,
        InMemoryInventoryStore,
        InMemoryEventPublisher,
    ) {
        let store = InMemoryInventoryStore::new();
        for (id, stock, price_cents) in products {
            store
                .upsert_product(ProductRow::new(
                    ProductId::new(*id),
                    *stock,
                    Money::from_cents(*price_cents),
                ))
                .await;
        }
        let publisher = InMemoryEventPublisher::new();
        let placement = OrderPlacement::new(store.clone(), publisher.clone());
        (placement, store, publisher)
    }

    fn request(product_id: &str, quantity: u32) -> PlacementRequest {
        PlacementRequest {
            product_id: ProductId::new(product_id),
            quantity,
            user_id: UserId::new("user-1"),
        }
    }

    #[tokio::test]
    async fn places_order_and_decrements_stock() {
        let (placement, store, publisher) = seeded(&[("SKU-001", 5, 1000)]).await;

        let placed = placement.place(request("SKU-001", 3)).await.unwrap();

        assert_eq!(placed.total_price.cents(), 3000);
        assert_eq!(placed.status, OrderStatus::Created);

        let product = store.get_product(&ProductId::new("SKU-001")).await.unwrap();
        assert_eq!(product.stock, 2);

        let orders = store.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, placed.order_id);
        assert_eq!(orders[0].quantity, 3);
        assert_eq!(orders[0].total_price.cents(), 3000);
        assert_eq!(orders[0].user_id.as_str(), "user-1");

        let events = publisher.published();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].order_id, placed.order_id);
        assert_eq!(events[0].product_id.as_str(), "SKU-001");
        assert_eq!(events[0].quantity, 3);
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_store_untouched() {
        let (placement, store, publisher) = seeded(&[("SKU-001", 2, 1000)]).await;

        let err = placement.place(request("SKU-001", 5)).await.unwrap_err();
        assert!(matches!(
            err,
            PlaceOrderError::InsufficientStock {
                available: 2,
                requested: 5,
                ..
            }
        ));

        let product = store.get_product(&ProductId::new("SKU-001")).await.unwrap();
        assert_eq!(product.stock, 2);
        assert_eq!(store.order_count(), 0);
        assert_eq!(publisher.published_count(), 0);
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let (placement, store, publisher) = seeded(&[]).await;

        let err = placement.place(request("SKU-404", 1)).await.unwrap_err();
        assert!(matches!(err, PlaceOrderError::ProductNotFound { .. }));
        assert_eq!(store.order_count(), 0);
        assert_eq!(publisher.published_count(), 0);
    }

    #[tokio::test]
    async fn validation_failure_precedes_store_access() {
        let (placement, store, publisher) = seeded(&[("SKU-001", 5, 1000)]).await;

        let payload: CreateOrderRequest =
            serde_json::from_value(serde_json::json!({ "productId": "SKU-001" })).unwrap();
        let err = placement.place_order(payload).await.unwrap_err();

        assert!(matches!(err, PlaceOrderError::Validation(_)));
        let product = store.get_product(&ProductId::new("SKU-001")).await.unwrap();
        assert_eq!(product.stock, 5);
        assert_eq!(store.order_count(), 0);
        assert_eq!(publisher.published_count(), 0);
    }

    #[tokio::test]
    async fn omitted_quantity_places_single_unit() {
        let (placement, store, _publisher) = seeded(&[("SKU-001", 5, 1000)]).await;

        let payload: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "productId": "SKU-001",
            "userId": "user-1",
        }))
        .unwrap();
        let placed = placement.place_order(payload).await.unwrap();

        assert_eq!(placed.total_price.cents(), 1000);
        let product = store.get_product(&ProductId::new("SKU-001")).await.unwrap();
        assert_eq!(product.stock, 4);
    }

    #[tokio::test]
    async fn lost_decrement_race_rolls_back_the_order() {
        let (placement, store, publisher) = seeded(&[("SKU-001", 5, 1000)]).await;
        store.set_conflict_on_decrement(true);

        let err = placement.place(request("SKU-001", 3)).await.unwrap_err();
        assert!(matches!(err, PlaceOrderError::StockConflict { .. }));

        // Order and decrement are all-or-nothing.
        let product = store.get_product(&ProductId::new("SKU-001")).await.unwrap();
        assert_eq!(product.stock, 5);
        assert_eq!(store.order_count(), 0);
        assert_eq!(publisher.published_count(), 0);
    }

    #[tokio::test]
    async fn publish_failure_does_not_unwind_the_order() {
        let (placement, store, publisher) = seeded(&[("SKU-001", 5, 1000)]).await;
        publisher.set_fail_on_publish(true);

        let placed = placement.place(request("SKU-001", 2)).await.unwrap();

        assert_eq!(placed.status, OrderStatus::Created);
        let product = store.get_product(&ProductId::new("SKU-001")).await.unwrap();
        assert_eq!(product.stock, 3);
        assert_eq!(store.order_count(), 1);
        assert_eq!(publisher.published_count(), 0);
    }

    #[tokio::test]
    async fn consecutive_orders_drain_stock_exactly() {
        let (placement, store, _publisher) = seeded(&[("SKU-001", 5, 1000)]).await;

        placement.place(request("SKU-001", 2)).await.unwrap();
        placement.place(request("SKU-001", 2)).await.unwrap();
        let err = placement.place(request("SKU-001", 2)).await.unwrap_err();

        assert!(matches!(
            err,
            PlaceOrderError::InsufficientStock { available: 1, .. }
        ));
        let product = store.get_product(&ProductId::new("SKU-001")).await.unwrap();
        assert_eq!(product.stock, 1);
        assert_eq!(store.order_count(), 2);
    }
}
