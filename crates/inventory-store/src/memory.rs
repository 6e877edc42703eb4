use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::ProductId;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    OrderRecord, ProductRow, Result, StoreError,
    store::{DEFAULT_LOCK_TIMEOUT, InventoryStore, StoreTx},
};

#[derive(Default)]
struct Inner {
    products: HashMap<ProductId, Arc<Mutex<ProductRow>>>,
    orders: Vec<OrderRecord>,
}

/// In-memory inventory store for testing.
///
/// Mirrors the PostgreSQL store's semantics: one exclusive lock per
/// product row, bounded lock waits, and staged writes that become visible
/// only on commit.
#[derive(Clone)]
pub struct InMemoryInventoryStore {
    inner: Arc<std::sync::Mutex<Inner>>,
    lock_timeout: Duration,
    conflict_on_decrement: Arc<AtomicBool>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty in-memory inventory store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(Inner::default())),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            conflict_on_decrement: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Overrides the bounded wait for product row locks.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Inserts or replaces a product row. Fixture hook, as catalog
    /// management lives outside this system.
    pub async fn upsert_product(&self, product: ProductRow) {
        let cell = {
            let mut inner = self.inner.lock().unwrap();
            match inner.products.get(&product.id) {
                Some(cell) => Arc::clone(cell),
                None => {
                    inner
                        .products
                        .insert(product.id.clone(), Arc::new(Mutex::new(product)));
                    return;
                }
            }
        };
        *cell.lock().await = product;
    }

    /// Reads a product row without locking it.
    pub async fn get_product(&self, product_id: &ProductId) -> Option<ProductRow> {
        let cell = {
            let inner = self.inner.lock().unwrap();
            inner.products.get(product_id).map(Arc::clone)
        }?;
        let row = cell.lock().await.clone();
        Some(row)
    }

    /// Returns all committed orders.
    pub fn orders(&self) -> Vec<OrderRecord> {
        self.inner.lock().unwrap().orders.clone()
    }

    /// Returns the number of committed orders.
    pub fn order_count(&self) -> usize {
        self.inner.lock().unwrap().orders.len()
    }

    /// Clears all products and orders.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.products.clear();
        inner.orders.clear();
    }

    /// Forces subsequent conditional decrements to affect zero rows,
    /// exercising the caller's race-guard path.
    pub fn set_conflict_on_decrement(&self, conflict: bool) {
        self.conflict_on_decrement.store(conflict, Ordering::SeqCst);
    }
}

impl Default for InMemoryInventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<InMemoryTx> {
        Ok(InMemoryTx {
            store: self.clone(),
            locked: None,
            staged_orders: Vec::new(),
            staged_decrement: None,
        })
    }
}

/// A unit of work on the in-memory store.
///
/// Holds the product row lock as an owned guard; dropping the transaction
/// releases the lock and discards staged writes.
pub struct InMemoryTx {
    store: InMemoryInventoryStore,
    locked: Option<OwnedMutexGuard<ProductRow>>,
    staged_orders: Vec<OrderRecord>,
    staged_decrement: Option<u32>,
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn lock_product(&mut self, product_id: &ProductId) -> Result<Option<ProductRow>> {
        let cell = {
            let inner = self.store.inner.lock().unwrap();
            match inner.products.get(product_id) {
                Some(cell) => Arc::clone(cell),
                None => return Ok(None),
            }
        };

        let waited = self.store.lock_timeout;
        let guard = tokio::time::timeout(waited, cell.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout { waited })?;

        let row = guard.clone();
        self.locked = Some(guard);
        Ok(Some(row))
    }

    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()> {
        self.staged_orders.push(order.clone());
        Ok(())
    }

    async fn decrement_stock(&mut self, product_id: &ProductId, quantity: u32) -> Result<u64> {
        if self.store.conflict_on_decrement.load(Ordering::SeqCst) {
            return Ok(0);
        }

        let Some(guard) = self.locked.as_ref() else {
            return Err(StoreError::InvalidTransactionState(
                "decrement_stock requires a locked product row",
            ));
        };
        if guard.id != *product_id {
            return Err(StoreError::InvalidTransactionState(
                "decrement_stock targets a row other than the locked one",
            ));
        }

        // Write-time guard, same as the SQL `WHERE stock >= $1`.
        if guard.stock < i64::from(quantity) {
            return Ok(0);
        }
        self.staged_decrement = Some(quantity);
        Ok(1)
    }

    async fn commit(mut self) -> Result<()> {
        if let Some(quantity) = self.staged_decrement.take() {
            match self.locked.as_mut() {
                Some(guard) => guard.stock -= i64::from(quantity),
                None => {
                    return Err(StoreError::InvalidTransactionState(
                        "staged decrement without a locked row",
                    ));
                }
            }
        }

        {
            let mut inner = self.store.inner.lock().unwrap();
            inner.orders.append(&mut self.staged_orders);
        }

        // Dropping `self` releases the row lock.
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        // Staged writes and the lock guard are dropped untouched.
        Ok(())
    }
}
