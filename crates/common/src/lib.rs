//! Shared types for the storefront backend.

mod money;
mod types;

pub use money::Money;
pub use types::{CategoryId, OrderId, ProductId};
