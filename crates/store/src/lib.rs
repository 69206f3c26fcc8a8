pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{CategoryId, Money, OrderId, ProductId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{
    Category, NewOrder, NewOrderItem, NewProduct, Order, OrderItem, OrderStatus, Product,
    ProductChanges, UnknownStatus,
};
pub use postgres::PostgresStore;
pub use query::{Page, PageRequest};
pub use store::{CatalogStore, OrderStore, StockAdjustment};
