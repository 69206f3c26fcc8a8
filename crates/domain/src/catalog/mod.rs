//! Category and product management.

mod commands;
mod service;

pub use commands::{CategoryRequest, ProductRequest, StockRequest};
pub use service::{CatalogService, ProductUpdate};

use store::{CategoryId, ProductId};
use thiserror::Error;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The category does not exist.
    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    /// The product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Another category already uses this name.
    #[error("Category name already exists: {0}")]
    DuplicateCategory(String),

    /// The store rejected the change.
    #[error("Update failed: {0}")]
    UpdateFailed(String),
}
