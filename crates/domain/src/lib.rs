//! Business layer of the storefront.
//!
//! This crate provides:
//! - `OrderService`, which validates and prices orders and persists them
//!   together with their stock decrements
//! - `CatalogService` for categories and products
//! - explicit per-request validation schemas
//! - order identifier generation
//! - response views for the HTTP layer

pub mod catalog;
pub mod error;
pub mod id;
pub mod order;
pub mod validation;
pub mod views;

pub use catalog::{
    CatalogError, CatalogService, CategoryRequest, ProductRequest, ProductUpdate, StockRequest,
};
pub use error::DomainError;
pub use id::{IdGenerationError, IdGenerator, NanoIdGenerator};
pub use order::{
    CreateOrderRequest, OrderError, OrderItemRequest, OrderService, UpdateOrderStatusRequest,
};
pub use validation::{Check, Validate, ValidationErrors, trim};
pub use views::{CategoryView, OrderItemView, OrderView, Paginated, ProductView};
