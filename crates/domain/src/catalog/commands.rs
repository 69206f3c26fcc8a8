//! Catalog requests and their validation schemas.

use serde::Deserialize;
use store::{CategoryId, Money, NewProduct, ProductChanges};

use crate::validation::{Check, Validate, trim};

pub const MAX_PRICE: i64 = 999_999_999;
pub const MAX_STOCK: i64 = 99_999;

/// Request to create or rename a category.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryRequest {
    pub name: String,
}

impl CategoryRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Validate for CategoryRequest {
    fn sanitize(&mut self) {
        trim(&mut self.name);
    }

    fn rules(&self) -> Vec<Check<'_>> {
        vec![Check::text("name", &self.name).required().max_len(100)]
    }
}

/// Request to create or replace a product.
///
/// `price` is in minor currency units. `stock` may be zero but must be given.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductRequest {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub stock: Option<i64>,
    pub category_id: i64,
}

impl ProductRequest {
    pub fn category_id(&self) -> CategoryId {
        CategoryId::new(self.category_id)
    }

    /// Fields for inserting the validated product.
    pub(crate) fn into_new_product(self, image_url: String) -> NewProduct {
        NewProduct {
            category_id: self.category_id(),
            name: self.name,
            description: self.description,
            price: Money::from_cents(self.price),
            stock: self.stock.unwrap_or_default() as i32,
            image_url,
        }
    }

    /// Changes replacing every field of the validated product.
    pub(crate) fn into_changes(self, image_url: Option<String>) -> ProductChanges {
        ProductChanges {
            category_id: Some(self.category_id()),
            name: Some(self.name),
            description: Some(self.description),
            price: Some(Money::from_cents(self.price)),
            stock: self.stock.map(|s| s as i32),
            image_url,
        }
    }
}

impl Validate for ProductRequest {
    fn sanitize(&mut self) {
        trim(&mut self.name);
        trim(&mut self.description);
    }

    fn rules(&self) -> Vec<Check<'_>> {
        vec![
            Check::text("name", &self.name)
                .required()
                .min_len(2)
                .max_len(200),
            Check::text("description", &self.description)
                .required()
                .min_len(10)
                .max_len(2000),
            Check::integer("price", self.price)
                .required()
                .gt(0.0)
                .lte(MAX_PRICE as f64),
            stock_check(self.stock),
            Check::integer("category_id", self.category_id)
                .required()
                .gt(0.0),
        ]
    }
}

/// Request to correct the stock of a product by hand.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StockRequest {
    pub stock: Option<i64>,
}

impl StockRequest {
    pub fn new(stock: i64) -> Self {
        Self { stock: Some(stock) }
    }
}

impl Validate for StockRequest {
    fn rules(&self) -> Vec<Check<'_>> {
        vec![stock_check(self.stock)]
    }
}

fn stock_check(stock: Option<i64>) -> Check<'static> {
    Check::optional_integer("stock", stock)
        .present()
        .gte(0.0)
        .lte(MAX_STOCK as f64)
}
