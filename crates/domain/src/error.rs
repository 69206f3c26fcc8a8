//! Domain error types.

use store::StoreError;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::order::OrderError;
use crate::validation::ValidationErrors;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The request failed its validation schema.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// An order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// A catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The store failed outside of any business rule.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
