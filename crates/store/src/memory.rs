use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    Category, CategoryId, Money, NewOrder, NewProduct, Order, OrderId, OrderItem, OrderStatus,
    Page, PageRequest, Product, ProductChanges, ProductId, Result, StoreError,
    store::{CatalogStore, OrderStore, StockAdjustment, lock_order},
};

#[derive(Debug, Clone)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: Money,
    stock: i32,
    category_id: CategoryId,
    image_url: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct OrderRow {
    id: OrderId,
    customer_name: String,
    whatsapp: String,
    map_address: String,
    latitude: f64,
    longitude: f64,
    address_note: String,
    total_price: Money,
    proof_of_payment: String,
    status: OrderStatus,
    items: Vec<OrderItemRow>,
    created_at: DateTime<Utc>,
    seq: u64,
}

#[derive(Debug, Clone)]
struct OrderItemRow {
    id: i64,
    product_id: Option<ProductId>,
    product_name: String,
    quantity: u32,
    price_at_purchase: Money,
}

#[derive(Debug, Default)]
struct State {
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, ProductRow>,
    orders: HashMap<OrderId, OrderRow>,
    next_category_id: i64,
    next_product_id: i64,
    next_item_id: i64,
    next_order_seq: u64,
    fail_on_order_insert: bool,
    fail_stock_update_for: HashSet<ProductId>,
}

impl State {
    fn hydrate_product(&self, row: &ProductRow) -> Result<Product> {
        let category = self.categories.get(&row.category_id).ok_or_else(|| {
            StoreError::InvalidReference(format!(
                "product {} references missing category {}",
                row.id, row.category_id
            ))
        })?;

        Ok(Product {
            id: row.id,
            name: row.name.clone(),
            description: row.description.clone(),
            price: row.price,
            stock: row.stock,
            category: category.clone(),
            image_url: row.image_url.clone(),
            created_at: row.created_at,
        })
    }

    fn hydrate_order(&self, row: &OrderRow) -> Result<Order> {
        let items = row
            .items
            .iter()
            .map(|item| {
                let product = match item.product_id.and_then(|id| self.products.get(&id)) {
                    Some(product) => Some(self.hydrate_product(product)?),
                    None => None,
                };
                Ok(OrderItem {
                    id: item.id,
                    order_id: row.id.clone(),
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    product,
                    quantity: item.quantity,
                    price_at_purchase: item.price_at_purchase,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Order {
            id: row.id.clone(),
            customer_name: row.customer_name.clone(),
            whatsapp: row.whatsapp.clone(),
            map_address: row.map_address.clone(),
            latitude: row.latitude,
            longitude: row.longitude,
            address_note: row.address_note.clone(),
            total_price: row.total_price,
            proof_of_payment: row.proof_of_payment.clone(),
            status: row.status,
            items,
            created_at: row.created_at,
        })
    }

    fn name_taken(&self, name: &str, except: Option<CategoryId>) -> bool {
        self.categories
            .values()
            .any(|c| c.name == name && Some(c.id) != except)
    }

    fn remove_product(&mut self, id: ProductId) -> Option<ProductRow> {
        let removed = self.products.remove(&id)?;
        for order in self.orders.values_mut() {
            for item in &mut order.items {
                if item.product_id == Some(id) {
                    item.product_id = None;
                }
            }
        }
        Some(removed)
    }
}

/// Newest first, insertion order breaking timestamp ties.
fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn paginate<T>(rows: Vec<T>, page: PageRequest) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    rows.into_iter()
        .skip(offset)
        .take(page.limit() as usize)
        .collect()
}

/// In-memory store implementation for testing and local runs.
///
/// This implementation keeps every table in memory behind one lock and
/// provides the same interface and atomicity as the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail the order insert of the next order transactions.
    pub async fn set_fail_on_order_insert(&self, fail: bool) {
        self.state.write().await.fail_on_order_insert = fail;
    }

    /// Configures the store to fail any stock adjustment touching `product_id`.
    pub async fn fail_stock_update_for(&self, product_id: ProductId) {
        self.state
            .write()
            .await
            .fail_stock_update_for
            .insert(product_id);
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn create_category(&self, name: &str) -> Result<Category> {
        let mut state = self.state.write().await;
        if state.name_taken(name, None) {
            return Err(StoreError::Conflict(format!(
                "category name already exists: {name}"
            )));
        }

        state.next_category_id += 1;
        let category = Category {
            id: CategoryId::new(state.next_category_id),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn list_categories(&self, page: PageRequest) -> Result<Page<Category>> {
        let state = self.state.read().await;
        let mut categories: Vec<_> = state.categories.values().cloned().collect();
        newest_first(&mut categories, |c| (c.created_at, c.id.as_i64()));

        Ok(Page {
            total: categories.len() as u64,
            items: paginate(categories, page),
        })
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn update_category(&self, id: CategoryId, name: &str) -> Result<Category> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&id) {
            return Err(StoreError::not_found("category", id));
        }
        if state.name_taken(name, Some(id)) {
            return Err(StoreError::Conflict(format!(
                "category name already exists: {name}"
            )));
        }

        let category = state
            .categories
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("category", id))?;
        category.name = name.to_string();
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<Vec<String>> {
        let mut state = self.state.write().await;
        if state.categories.remove(&id).is_none() {
            return Err(StoreError::not_found("category", id));
        }

        let orphaned: Vec<ProductId> = state
            .products
            .values()
            .filter(|p| p.category_id == id)
            .map(|p| p.id)
            .collect();
        let images = orphaned
            .into_iter()
            .filter_map(|product_id| state.remove_product(product_id))
            .map(|row| row.image_url)
            .filter(|url| !url.is_empty())
            .collect();
        Ok(images)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&product.category_id) {
            return Err(StoreError::InvalidReference(format!(
                "category {} does not exist",
                product.category_id
            )));
        }

        state.next_product_id += 1;
        let row = ProductRow {
            id: ProductId::new(state.next_product_id),
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            category_id: product.category_id,
            image_url: product.image_url,
            created_at: Utc::now(),
        };
        let created = state.hydrate_product(&row)?;
        state.products.insert(row.id, row);
        Ok(created)
    }

    async fn list_products(&self, page: PageRequest) -> Result<Page<Product>> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state.products.values().collect();
        newest_first(&mut rows, |p| (p.created_at, p.id.as_i64()));
        let total = rows.len() as u64;

        let items = paginate(rows, page)
            .into_iter()
            .map(|row| state.hydrate_product(row))
            .collect::<Result<Vec<_>>>()?;
        Ok(Page { items, total })
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let state = self.state.read().await;
        state
            .products
            .get(&id)
            .map(|row| state.hydrate_product(row))
            .transpose()
    }

    async fn update_product(&self, id: ProductId, changes: ProductChanges) -> Result<Product> {
        let mut state = self.state.write().await;
        if let Some(category_id) = changes.category_id
            && !state.categories.contains_key(&category_id)
        {
            return Err(StoreError::InvalidReference(format!(
                "category {category_id} does not exist"
            )));
        }
        if let Some(stock) = changes.stock
            && stock < 0
        {
            return Err(StoreError::ConstraintViolation(format!(
                "stock must not be negative, got {stock}"
            )));
        }

        let row = state
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("product", id))?;
        if let Some(name) = changes.name {
            row.name = name;
        }
        if let Some(description) = changes.description {
            row.description = description;
        }
        if let Some(price) = changes.price {
            row.price = price;
        }
        if let Some(stock) = changes.stock {
            row.stock = stock;
        }
        if let Some(category_id) = changes.category_id {
            row.category_id = category_id;
        }
        if let Some(image_url) = changes.image_url {
            row.image_url = image_url;
        }

        let row = row.clone();
        state.hydrate_product(&row)
    }

    async fn delete_product(&self, id: ProductId) -> Result<Product> {
        let mut state = self.state.write().await;
        let row = state
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("product", id))?;
        let product = state.hydrate_product(&row)?;
        state.remove_product(id);
        Ok(product)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    #[tracing::instrument(skip(self, order, adjustments), fields(order_id = %order.id))]
    async fn create_order_with_stock_adjustment(
        &self,
        order: NewOrder,
        adjustments: Vec<StockAdjustment>,
    ) -> Result<Order> {
        // The write lock is held from the first check to the last write, so
        // nothing below is observable until every step has succeeded.
        let mut state = self.state.write().await;

        // Stage stock changes; nothing is written until every check passes.
        let mut staged: HashMap<ProductId, i32> = HashMap::new();
        for adjustment in lock_order(adjustments) {
            let product_id = adjustment.product_id;
            if state.fail_stock_update_for.contains(&product_id) {
                return Err(StoreError::StockUpdateFailed {
                    product_id,
                    reason: "injected failure".to_string(),
                });
            }

            let current = match staged.get(&product_id) {
                Some(stock) => *stock,
                None => state
                    .products
                    .get(&product_id)
                    .map(|p| p.stock)
                    .ok_or_else(|| StoreError::StockUpdateFailed {
                        product_id,
                        reason: "product does not exist".to_string(),
                    })?,
            };

            let requested = i32::try_from(adjustment.quantity).unwrap_or(i32::MAX);
            if current < requested {
                metrics::counter!("stock_guard_rejections_total").increment(1);
                return Err(StoreError::InsufficientStock {
                    product_id,
                    requested: adjustment.quantity,
                });
            }

            let remaining = current - requested;
            if remaining != adjustment.new_stock {
                tracing::debug!(
                    %product_id,
                    expected = adjustment.new_stock,
                    actual = remaining,
                    "stock moved since it was read"
                );
            }
            staged.insert(product_id, remaining);
        }

        if state.fail_on_order_insert {
            return Err(StoreError::OrderInsertFailed(
                "injected failure".to_string(),
            ));
        }
        if state.orders.contains_key(&order.id) {
            return Err(StoreError::OrderInsertFailed(format!(
                "order {} already exists",
                order.id
            )));
        }
        if let Some(missing) = order
            .items
            .iter()
            .find(|item| !state.products.contains_key(&item.product.id))
        {
            return Err(StoreError::OrderInsertFailed(format!(
                "product {} does not exist",
                missing.product.id
            )));
        }

        // Commit.
        for (product_id, stock) in staged {
            if let Some(product) = state.products.get_mut(&product_id) {
                product.stock = stock;
            }
        }

        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            state.next_item_id += 1;
            items.push(OrderItemRow {
                id: state.next_item_id,
                product_id: Some(item.product.id),
                product_name: item.product.name,
                quantity: item.quantity,
                price_at_purchase: item.price_at_purchase,
            });
        }

        state.next_order_seq += 1;
        let row = OrderRow {
            id: order.id,
            customer_name: order.customer_name,
            whatsapp: order.whatsapp,
            map_address: order.map_address,
            latitude: order.latitude,
            longitude: order.longitude,
            address_note: order.address_note,
            total_price: order.total_price,
            proof_of_payment: order.proof_of_payment,
            status: order.status,
            items,
            created_at: Utc::now(),
            seq: state.next_order_seq,
        };
        let created = state.hydrate_order(&row)?;
        state.orders.insert(row.id.clone(), row);
        Ok(created)
    }

    async fn list_orders(&self, page: PageRequest) -> Result<Page<Order>> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state.orders.values().collect();
        newest_first(&mut rows, |o| (o.created_at, o.seq as i64));
        let total = rows.len() as u64;

        let items = paginate(rows, page)
            .into_iter()
            .map(|row| state.hydrate_order(row))
            .collect::<Result<Vec<_>>>()?;
        Ok(Page { items, total })
    }

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        state
            .orders
            .get(id)
            .map(|row| state.hydrate_order(row))
            .transpose()
    }

    async fn update_order_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order> {
        let mut state = self.state.write().await;
        let row = state
            .orders
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("order", id))?;
        row.status = status;

        let row = row.clone();
        state.hydrate_order(&row)
    }

    async fn delete_order(&self, id: &OrderId) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .orders
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("order", id))
    }
}
