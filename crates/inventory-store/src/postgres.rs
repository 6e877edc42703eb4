use std::time::Duration;

use async_trait::async_trait;
use common::{Money, ProductId};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    OrderRecord, ProductRow, Result, StoreError,
    store::{DEFAULT_LOCK_TIMEOUT, InventoryStore, StoreTx},
};

/// PostgreSQL-backed inventory store.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresInventoryStore {
    /// Creates a new PostgreSQL inventory store.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Overrides the bounded wait for product row locks.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Inserts or replaces a product row.
    ///
    /// Catalog management belongs to an external collaborator; this is a
    /// fixture hook for tests and operational seeding.
    pub async fn upsert_product(&self, product: &ProductRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, stock, price_cents)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                stock = EXCLUDED.stock,
                price_cents = EXCLUDED.price_cents
            "#,
        )
        .bind(product.id.as_str())
        .bind(product.stock)
        .bind(product.unit_price.cents())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reads a product row without locking it.
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Option<ProductRow>> {
        let row = sqlx::query("SELECT id, stock, price_cents FROM products WHERE id = $1")
            .bind(product_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_product).transpose()
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    type Tx = PostgresTx;

    async fn begin(&self) -> Result<PostgresTx> {
        let mut tx = self.pool.begin().await?;

        // SET LOCAL scopes the bound to this transaction; it takes no bind
        // parameters, hence the formatted statement.
        let bound = format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        );
        sqlx::query(&bound).execute(&mut *tx).await?;

        Ok(PostgresTx {
            tx,
            lock_timeout: self.lock_timeout,
        })
    }
}

/// A unit of work on the PostgreSQL store.
///
/// Wraps a sqlx transaction: dropping it without commit rolls back, which
/// releases the row lock on every exit path.
pub struct PostgresTx {
    tx: sqlx::Transaction<'static, sqlx::Postgres>,
    lock_timeout: Duration,
}

#[async_trait]
impl StoreTx for PostgresTx {
    async fn lock_product(&mut self, product_id: &ProductId) -> Result<Option<ProductRow>> {
        let row =
            sqlx::query("SELECT id, stock, price_cents FROM products WHERE id = $1 FOR UPDATE")
                .bind(product_id.as_str())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(|e| {
                    let err = map_lock_error(e, self.lock_timeout);
                    if matches!(err, StoreError::LockTimeout { .. }) {
                        tracing::debug!(product_id = %product_id, "row lock wait exceeded bound");
                    }
                    err
                })?;

        row.map(row_to_product).transpose()
    }

    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, product_id, quantity, total_price_cents, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_str())
        .bind(order.product_id.as_str())
        .bind(i64::from(order.quantity))
        .bind(order.total_price.cents())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn decrement_stock(&mut self, product_id: &ProductId, quantity: u32) -> Result<u64> {
        let result =
            sqlx::query("UPDATE products SET stock = stock - $1 WHERE id = $2 AND stock >= $1")
                .bind(i64::from(quantity))
                .bind(product_id.as_str())
                .execute(&mut *self.tx)
                .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Postgres signals an exceeded `lock_timeout` with SQLSTATE 55P03.
fn map_lock_error(err: sqlx::Error, waited: Duration) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.code().as_deref() == Some("55P03")
    {
        return StoreError::LockTimeout { waited };
    }
    StoreError::Database(err)
}

fn row_to_product(row: PgRow) -> Result<ProductRow> {
    Ok(ProductRow {
        id: ProductId::new(row.try_get::<String, _>("id")?),
        stock: row.try_get("stock")?,
        unit_price: Money::from_cents(row.try_get("price_cents")?),
    })
}
