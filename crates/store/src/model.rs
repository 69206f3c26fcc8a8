//! Persisted records of the catalog and order tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CategoryId, Money, OrderId, ProductId};

/// A product category.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A product with its category joined in.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    /// Never negative; the tables enforce this with a CHECK constraint.
    pub stock: i32,
    pub category: Category,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Returns the ID of the owning category.
    pub fn category_id(&self) -> CategoryId {
        self.category.id
    }
}

/// Fields of a product to be inserted.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: i32,
    pub category_id: CategoryId,
    pub image_url: String,
}

/// Partial product update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<i32>,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
}

impl ProductChanges {
    /// Changes only the stock level.
    pub fn stock(stock: i32) -> Self {
        Self {
            stock: Some(stock),
            ..Default::default()
        }
    }
}

/// The status of an order.
///
/// Any status may move to any other; there is no transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting review of the proof of payment.
    #[default]
    Pending,

    /// Payment accepted.
    Success,

    /// Payment rejected.
    Rejected,
}

impl OrderStatus {
    /// All statuses, in declaration order.
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::Success,
        OrderStatus::Rejected,
    ];

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Success => "success",
            OrderStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown order status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A persisted order together with its items.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub whatsapp: String,
    pub map_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address_note: String,
    /// Computed once at creation and never recomputed.
    pub total_price: Money,
    pub proof_of_payment: String,
    pub status: OrderStatus,
    /// In insertion order.
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Sums `quantity * price_at_purchase` over the items.
    pub fn items_total(&self) -> Money {
        self.items
            .iter()
            .map(|item| item.price_at_purchase.multiply(item.quantity))
            .sum()
    }
}

/// A line of an order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    /// `None` once the product has been deleted; the order history survives.
    pub product_id: Option<ProductId>,
    /// Product name frozen at purchase time.
    pub product_name: String,
    /// The live product, when it still exists.
    pub product: Option<Product>,
    pub quantity: u32,
    /// Unit price frozen at purchase time.
    pub price_at_purchase: Money,
}

/// An order that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub customer_name: String,
    pub whatsapp: String,
    pub map_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address_note: String,
    pub total_price: Money,
    pub proof_of_payment: String,
    pub status: OrderStatus,
    pub items: Vec<NewOrderItem>,
}

/// A line of an order that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    /// The product as read while validating the order.
    pub product: Product,
    pub quantity: u32,
    pub price_at_purchase: Money,
}
