use async_trait::async_trait;

use crate::{
    Category, CategoryId, NewOrder, NewProduct, Order, OrderId, OrderStatus, Page, PageRequest,
    Product, ProductChanges, ProductId, Result,
};

/// A stock change computed while validating an order.
///
/// `new_stock` is the level the caller expects from its read snapshot. Stores
/// apply `quantity` as a guarded decrement against the locked row, so a
/// concurrent order that moved the stock in between can never drive it
/// negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub quantity: u32,
    pub new_stock: i32,
}

/// Storage for categories and products.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts a category. Fails with `Conflict` if the name is taken.
    async fn create_category(&self, name: &str) -> Result<Category>;

    /// Lists categories, newest first.
    async fn list_categories(&self, page: PageRequest) -> Result<Page<Category>>;

    /// Retrieves a category. Returns None if it doesn't exist.
    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>>;

    /// Renames a category.
    async fn update_category(&self, id: CategoryId, name: &str) -> Result<Category>;

    /// Deletes a category and every product in it. Returns the image
    /// references of the removed products.
    async fn delete_category(&self, id: CategoryId) -> Result<Vec<String>>;

    /// Inserts a product. Fails with `InvalidReference` if the category is missing.
    async fn create_product(&self, product: NewProduct) -> Result<Product>;

    /// Lists products with their categories, newest first.
    async fn list_products(&self, page: PageRequest) -> Result<Page<Product>>;

    /// Retrieves a product with its category. Returns None if it doesn't exist.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Applies a partial update to a product.
    async fn update_product(&self, id: ProductId, changes: ProductChanges) -> Result<Product>;

    /// Deletes a product and returns it. Order items keep their history with
    /// the product reference cleared.
    async fn delete_product(&self, id: ProductId) -> Result<Product>;
}

/// Storage for orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Applies every stock adjustment and inserts the order with its items as
    /// one atomic unit.
    ///
    /// Either everything is durably visible afterwards or nothing is: a failed
    /// adjustment or insert leaves no stock change and no order row behind.
    async fn create_order_with_stock_adjustment(
        &self,
        order: NewOrder,
        adjustments: Vec<StockAdjustment>,
    ) -> Result<Order>;

    /// Lists orders with their items, newest first.
    async fn list_orders(&self, page: PageRequest) -> Result<Page<Order>>;

    /// Retrieves an order with its items. Returns None if it doesn't exist.
    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>>;

    /// Sets the status of an order.
    async fn update_order_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order>;

    /// Deletes an order and its items. Stock is not restored.
    async fn delete_order(&self, id: &OrderId) -> Result<()>;
}

/// Orders adjustments by product key so concurrent transactions lock rows in
/// the same order.
pub(crate) fn lock_order(mut adjustments: Vec<StockAdjustment>) -> Vec<StockAdjustment> {
    adjustments.sort_by_key(|a| a.product_id);
    adjustments
}
