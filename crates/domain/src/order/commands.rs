//! Order requests and their validation schemas.

use serde::Deserialize;
use store::OrderStatus;

use crate::validation::{Check, Validate, ValidationErrors, trim};

/// Maximum number of lines in one order.
pub const MAX_ITEMS: usize = 50;

/// Maximum quantity of one line.
pub const MAX_QUANTITY: i64 = 100;

const STATUS_NAMES: &[&str] = &["pending", "success", "rejected"];

/// Request to place an order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub whatsapp: String,
    pub map_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address_note: String,
    pub items: Vec<OrderItemRequest>,
}

/// One requested line of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: i64,
}

impl OrderItemRequest {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

impl Validate for CreateOrderRequest {
    fn sanitize(&mut self) {
        trim(&mut self.customer_name);
        trim(&mut self.whatsapp);
        trim(&mut self.map_address);
        trim(&mut self.address_note);
    }

    fn rules(&self) -> Vec<Check<'_>> {
        let mut checks = vec![
            Check::text("customer_name", &self.customer_name)
                .required()
                .min_len(2)
                .max_len(100),
            Check::text("whatsapp", &self.whatsapp)
                .required()
                .min_len(10)
                .max_len(15),
            Check::text("map_address", &self.map_address).max_len(500),
            Check::number("latitude", self.latitude).gte(-90.0).lte(90.0),
            Check::number("longitude", self.longitude)
                .gte(-180.0)
                .lte(180.0),
            Check::text("address_note", &self.address_note).max_len(500),
            Check::count("items", self.items.len())
                .required()
                .min_len(1)
                .max_len(MAX_ITEMS),
        ];

        for (i, item) in self.items.iter().enumerate() {
            checks.push(
                Check::integer(format!("items[{i}].product_id"), item.product_id)
                    .required()
                    .gt(0.0),
            );
            checks.push(
                Check::integer(format!("items[{i}].quantity"), item.quantity)
                    .required()
                    .gt(0.0)
                    .lte(MAX_QUANTITY as f64),
            );
        }
        checks
    }
}

/// Request to change the status of an order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

impl UpdateOrderStatusRequest {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }

    /// Parses the validated status.
    pub fn status(&self) -> Result<OrderStatus, ValidationErrors> {
        self.status.parse().map_err(|_| {
            ValidationErrors::single(
                "status",
                format!("must be one of: {}", STATUS_NAMES.join(" ")),
            )
        })
    }
}

impl Validate for UpdateOrderStatusRequest {
    fn sanitize(&mut self) {
        trim(&mut self.status);
    }

    fn rules(&self) -> Vec<Check<'_>> {
        vec![
            Check::text("status", &self.status)
                .required()
                .one_of(STATUS_NAMES),
        ]
    }
}
