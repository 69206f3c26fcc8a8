use thiserror::Error;

use crate::ProductId;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A row references another row that does not exist.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// A CHECK constraint was violated.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A guarded stock decrement found less stock than requested.
    #[error("Insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
    },

    /// The atomic unit could not be started or committed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A stock adjustment statement failed inside the order transaction.
    #[error("Stock update failed for product {product_id}: {reason}")]
    StockUpdateFailed {
        product_id: ProductId,
        reason: String,
    },

    /// The order row or one of its item rows could not be inserted.
    #[error("Order insert failed: {0}")]
    OrderInsertFailed(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
