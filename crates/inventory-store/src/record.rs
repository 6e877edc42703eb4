//! Row types for the `products` and `orders` tables.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// A row in the `products` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRow {
    pub id: ProductId,
    /// Units on hand. Never negative; only mutated under the row lock.
    pub stock: i64,
    pub unit_price: Money,
}

impl ProductRow {
    /// Creates a new product row.
    pub fn new(id: ProductId, stock: i64, unit_price: Money) -> Self {
        Self {
            id,
            stock,
            unit_price,
        }
    }
}

/// Status stored with an order row.
///
/// New orders always start as `created`; later stages of the system
/// advance the status outside the placement transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
}

impl OrderStatus {
    /// Returns the status as stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row in the `orders` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price times quantity, captured at creation time.
    pub total_price: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}
