//! Order placement and administration.

mod commands;
mod service;

pub use commands::{CreateOrderRequest, OrderItemRequest, UpdateOrderStatusRequest};
pub use service::OrderService;

use store::{OrderId, ProductId};
use thiserror::Error;

use crate::id::IdGenerationError;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A line item references a product that does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A line item asks for more than the product has in stock.
    #[error("Insufficient stock for product {product}")]
    InsufficientStock { product: String },

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The atomic create-and-adjust write failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No order identifier could be generated.
    #[error(transparent)]
    IdentifierGenerationFailed(#[from] IdGenerationError),
}
