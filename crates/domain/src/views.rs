//! External response shapes.
//!
//! Every view is built from a borrowed record and never mutates it.
//! Timestamps are rendered as RFC 3339 in UTC with second precision.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use store::{
    Category, CategoryId, Money, Order, OrderId, OrderItem, OrderStatus, Page, PageRequest,
    Product, ProductId,
};

/// Formats a timestamp as `2024-01-02T03:04:05Z`.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryView {
    pub id: CategoryId,
    pub name: String,
    pub created_at: String,
}

impl From<&Category> for CategoryView {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            created_at: format_timestamp(category.created_at),
        }
    }
}

/// A product with its category flattened in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: i32,
    pub category: CategoryView,
    pub image_url: String,
    pub created_at: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            stock: product.stock,
            category: CategoryView::from(&product.category),
            image_url: product.image_url.clone(),
            created_at: format_timestamp(product.created_at),
        }
    }
}

/// An order line. `product` is `None` once the product has been deleted;
/// `product_name` and `price_at_purchase` always reflect the time of purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemView {
    pub id: i64,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub product: Option<ProductView>,
    pub quantity: u32,
    pub price_at_purchase: Money,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            product: item.product.as_ref().map(ProductView::from),
            quantity: item.quantity,
            price_at_purchase: item.price_at_purchase,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
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
    pub order_items: Vec<OrderItemView>,
    pub created_at: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            customer_name: order.customer_name.clone(),
            whatsapp: order.whatsapp.clone(),
            map_address: order.map_address.clone(),
            latitude: order.latitude,
            longitude: order.longitude,
            address_note: order.address_note.clone(),
            total_price: order.total_price,
            proof_of_payment: order.proof_of_payment.clone(),
            status: order.status,
            order_items: order.items.iter().map(OrderItemView::from).collect(),
            created_at: format_timestamp(order.created_at),
        }
    }
}

/// A page of views with its pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

impl<T> Paginated<T> {
    /// Maps every record of a store page into its view.
    pub fn from_page<R>(page: &Page<R>, request: PageRequest) -> Self
    where
        T: for<'a> From<&'a R>,
    {
        Self {
            data: page.items.iter().map(T::from).collect(),
            page: request.page(),
            limit: request.limit(),
            total: page.total,
        }
    }
}
