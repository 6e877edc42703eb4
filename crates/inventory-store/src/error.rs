use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when interacting with the inventory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The product row lock was not acquired within the bounded wait.
    #[error("Product row lock not acquired within {waited:?}")]
    LockTimeout { waited: Duration },

    /// A transaction was driven outside its contract, e.g. a decrement
    /// without a prior row lock.
    #[error("Transaction misuse: {0}")]
    InvalidTransactionState(&'static str),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
