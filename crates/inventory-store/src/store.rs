use std::time::Duration;

use async_trait::async_trait;
use common::ProductId;

use crate::{OrderRecord, ProductRow, Result};

/// Default bound on how long a transaction waits for a product row lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// A single atomic unit of work against the inventory store.
///
/// All staged writes become visible together on [`StoreTx::commit`] or not
/// at all. Implementations must guarantee that dropping a transaction
/// without committing discards every staged write and releases any held
/// row lock, so the unit of work is closed on every exit path.
#[async_trait]
pub trait StoreTx: Send {
    /// Acquires an exclusive lock on the product row and returns its
    /// current state.
    ///
    /// Concurrent transactions locking the same product block until this
    /// transaction finishes. Returns `None` when no such product exists.
    /// The wait is bounded; exceeding the bound fails with
    /// [`StoreError::LockTimeout`](crate::StoreError::LockTimeout).
    async fn lock_product(&mut self, product_id: &ProductId) -> Result<Option<ProductRow>>;

    /// Stages a new order row.
    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()>;

    /// Decrements the product's stock by `quantity`, guarded by a stock
    /// re-check at write time.
    ///
    /// Returns the number of rows affected: zero means the guard condition
    /// `stock >= quantity` no longer held and nothing was written.
    async fn decrement_stock(&mut self, product_id: &ProductId, quantity: u32) -> Result<u64>;

    /// Commits the unit of work, making all staged writes visible at once.
    async fn commit(self) -> Result<()>;

    /// Rolls the unit of work back, discarding all staged writes.
    async fn rollback(self) -> Result<()>;
}

/// Handle to the persistent store backing products and orders.
///
/// Implementations are cheap to clone and thread-safe; each placement
/// request begins its own transaction through this handle rather than
/// reaching for ambient state.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// The transaction type produced by [`InventoryStore::begin`].
    type Tx: StoreTx;

    /// Begins a new unit of work.
    async fn begin(&self) -> Result<Self::Tx>;
}
