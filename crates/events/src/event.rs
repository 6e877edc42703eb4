use common::{OrderId, ProductId};
use serde::{Deserialize, Serialize};

/// Notification that an order was committed.
///
/// Produced exactly once per successfully committed order, strictly after
/// the commit. Not part of the transactional store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderCreated {
    /// Wire name of this event.
    pub const EVENT_TYPE: &'static str = "order.created";
}
