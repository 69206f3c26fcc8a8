use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};

use crate::{
    Category, CategoryId, Money, NewOrder, NewProduct, Order, OrderId, OrderItem, OrderStatus,
    Page, PageRequest, Product, ProductChanges, ProductId, Result, StoreError,
    store::{CatalogStore, OrderStore, StockAdjustment, lock_order},
};

const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.name, p.description, p.price, p.stock, p.image_url, p.created_at,
           c.id AS category_id, c.name AS category_name, c.created_at AS category_created_at
    FROM products p
    JOIN categories c ON c.id = p.category_id
"#;

const ORDER_SELECT: &str = r#"
    SELECT id, customer_name, whatsapp, map_address, latitude, longitude, address_note,
           total_price, proof_of_payment, status, created_at
    FROM orders
"#;

const ITEM_SELECT: &str = r#"
    SELECT oi.id, oi.order_id, oi.product_id, oi.product_name, oi.quantity, oi.price_at_purchase,
           p.id AS p_id, p.name AS p_name, p.description AS p_description, p.price AS p_price,
           p.stock AS p_stock, p.image_url AS p_image_url, p.created_at AS p_created_at,
           c.id AS c_id, c.name AS c_name, c.created_at AS c_created_at
    FROM order_items oi
    LEFT JOIN products p ON p.id = oi.product_id
    LEFT JOIN categories c ON c.id = p.category_id
    WHERE oi.order_id = ANY($1)
    ORDER BY oi.id ASC
"#;

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool and wraps it in a store.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_category(row: &PgRow) -> Result<Category> {
        Ok(Category {
            id: CategoryId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price")?),
            stock: row.try_get("stock")?,
            category: Category {
                id: CategoryId::new(row.try_get("category_id")?),
                name: row.try_get("category_name")?,
                created_at: row.try_get("category_created_at")?,
            },
            image_url: row.try_get("image_url")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItem> {
        let product = match row.try_get::<Option<i64>, _>("p_id")? {
            Some(id) => Some(Product {
                id: ProductId::new(id),
                name: row.try_get("p_name")?,
                description: row.try_get("p_description")?,
                price: Money::from_cents(row.try_get("p_price")?),
                stock: row.try_get("p_stock")?,
                category: Category {
                    id: CategoryId::new(row.try_get("c_id")?),
                    name: row.try_get("c_name")?,
                    created_at: row.try_get("c_created_at")?,
                },
                image_url: row.try_get("p_image_url")?,
                created_at: row.try_get("p_created_at")?,
            }),
            None => None,
        };

        let quantity: i32 = row.try_get("quantity")?;
        Ok(OrderItem {
            id: row.try_get("id")?,
            order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
            product_id: row
                .try_get::<Option<i64>, _>("product_id")?
                .map(ProductId::new),
            product_name: row.try_get("product_name")?,
            product,
            quantity: u32::try_from(quantity).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            price_at_purchase: Money::from_cents(row.try_get("price_at_purchase")?),
        })
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::new(row.try_get::<String, _>("id")?),
            customer_name: row.try_get("customer_name")?,
            whatsapp: row.try_get("whatsapp")?,
            map_address: row.try_get("map_address")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            address_note: row.try_get("address_note")?,
            total_price: Money::from_cents(row.try_get("total_price")?),
            proof_of_payment: row.try_get("proof_of_payment")?,
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            items,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Loads the items of the given orders, grouped by order ID.
    async fn load_items(&self, order_ids: Vec<String>) -> Result<HashMap<String, Vec<OrderItem>>> {
        let rows = sqlx::query(ITEM_SELECT)
            .bind(order_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: HashMap<String, Vec<OrderItem>> = HashMap::new();
        for row in &rows {
            let item = Self::row_to_item(row)?;
            grouped
                .entry(item.order_id.as_str().to_string())
                .or_default()
                .push(item);
        }
        Ok(grouped)
    }

    async fn orders_with_items(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let ids = rows
            .iter()
            .map(|row| row.try_get::<String, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut items = self.load_items(ids).await?;

        rows.iter()
            .map(|row| {
                let id: String = row.try_get("id")?;
                Self::row_to_order(row, items.remove(&id).unwrap_or_default())
            })
            .collect()
    }
}

/// Maps constraint violations of a write onto store errors.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        let message = db_err.message().to_string();
        if db_err.is_unique_violation() {
            return StoreError::Conflict(message);
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::InvalidReference(message);
        }
        if db_err.is_check_violation() {
            return StoreError::ConstraintViolation(message);
        }
    }
    StoreError::Database(err)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn create_category(&self, name: &str) -> Result<Category> {
        let row = sqlx::query("INSERT INTO categories (name) VALUES ($1) RETURNING id, name, created_at")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;

        Self::row_to_category(&row)
    }

    async fn list_categories(&self, page: PageRequest) -> Result<Page<Category>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, name, created_at
            FROM categories
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(page.limit()))
        .bind(to_i64(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: rows.iter().map(Self::row_to_category).collect::<Result<_>>()?,
            total: total as u64,
        })
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name, created_at FROM categories WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_category).transpose()
    }

    async fn update_category(&self, id: CategoryId, name: &str) -> Result<Category> {
        let row = sqlx::query(
            "UPDATE categories SET name = $2 WHERE id = $1 RETURNING id, name, created_at",
        )
        .bind(id.as_i64())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        match row {
            Some(row) => Self::row_to_category(&row),
            None => Err(StoreError::not_found("category", id)),
        }
    }

    async fn delete_category(&self, id: CategoryId) -> Result<Vec<String>> {
        let mut tx = self.pool.begin().await?;

        // Products go first so their image references can be returned.
        let images: Vec<String> = sqlx::query_scalar(
            "DELETE FROM products WHERE category_id = $1 AND image_url <> '' RETURNING image_url",
        )
        .bind(id.as_i64())
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("category", id));
        }
        tx.commit().await?;
        Ok(images)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (name, description, price, stock, category_id, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.stock)
        .bind(product.category_id.as_i64())
        .bind(&product.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        self.get_product(ProductId::new(id))
            .await?
            .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn list_products(&self, page: PageRequest) -> Result<Page<Product>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        let sql = format!("{PRODUCT_SELECT} ORDER BY p.created_at DESC, p.id DESC LIMIT $1 OFFSET $2");
        let rows = sqlx::query(&sql)
            .bind(i64::from(page.limit()))
            .bind(to_i64(page.offset()))
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: rows.iter().map(Self::row_to_product).collect::<Result<_>>()?,
            total: total as u64,
        })
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn update_product(&self, id: ProductId, changes: ProductChanges) -> Result<Product> {
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                stock = COALESCE($5, stock),
                category_id = COALESCE($6, category_id),
                image_url = COALESCE($7, image_url)
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id.as_i64())
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.price.map(|p| p.cents()))
        .bind(changes.stock)
        .bind(changes.category_id.map(|c| c.as_i64()))
        .bind(changes.image_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        if updated.is_none() {
            return Err(StoreError::not_found("product", id));
        }
        self.get_product(id)
            .await?
            .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn delete_product(&self, id: ProductId) -> Result<Product> {
        let product = self
            .get_product(id)
            .await?
            .ok_or_else(|| StoreError::not_found("product", id))?;

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", id));
        }
        Ok(product)
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    #[tracing::instrument(skip(self, order, adjustments), fields(order_id = %order.id))]
    async fn create_order_with_stock_adjustment(
        &self,
        order: NewOrder,
        adjustments: Vec<StockAdjustment>,
    ) -> Result<Order> {
        // Dropping the transaction on any early return rolls it back.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::TransactionFailed(e.to_string()))?;

        // The guarded UPDATE takes the row lock; a concurrent writer blocks
        // until we finish and then re-checks `stock >= $2` against our result.
        let mut remaining: HashMap<ProductId, i32> = HashMap::new();
        for adjustment in lock_order(adjustments) {
            let product_id = adjustment.product_id;
            let quantity = i32::try_from(adjustment.quantity).map_err(|e| {
                StoreError::StockUpdateFailed {
                    product_id,
                    reason: e.to_string(),
                }
            })?;

            let updated: Option<i32> = sqlx::query_scalar(
                "UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2 RETURNING stock",
            )
            .bind(product_id.as_i64())
            .bind(quantity)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::StockUpdateFailed {
                product_id,
                reason: e.to_string(),
            })?;

            match updated {
                Some(stock) => {
                    if stock != adjustment.new_stock {
                        tracing::debug!(
                            %product_id,
                            expected = adjustment.new_stock,
                            actual = stock,
                            "stock moved since it was read"
                        );
                    }
                    remaining.insert(product_id, stock);
                }
                None => {
                    let exists: Option<i64> =
                        sqlx::query_scalar("SELECT id FROM products WHERE id = $1")
                            .bind(product_id.as_i64())
                            .fetch_optional(&mut *tx)
                            .await
                            .map_err(|e| StoreError::StockUpdateFailed {
                                product_id,
                                reason: e.to_string(),
                            })?;

                    return Err(match exists {
                        Some(_) => {
                            metrics::counter!("stock_guard_rejections_total").increment(1);
                            StoreError::InsufficientStock {
                                product_id,
                                requested: adjustment.quantity,
                            }
                        }
                        None => StoreError::StockUpdateFailed {
                            product_id,
                            reason: "product does not exist".to_string(),
                        },
                    });
                }
            }
        }

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO orders (id, customer_name, whatsapp, map_address, latitude, longitude,
                                address_note, total_price, proof_of_payment, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING created_at
            "#,
        )
        .bind(order.id.as_str())
        .bind(&order.customer_name)
        .bind(&order.whatsapp)
        .bind(&order.map_address)
        .bind(order.latitude)
        .bind(order.longitude)
        .bind(&order.address_note)
        .bind(order.total_price.cents())
        .bind(&order.proof_of_payment)
        .bind(order.status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::OrderInsertFailed(e.to_string()))?;

        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            let quantity = i32::try_from(item.quantity)
                .map_err(|e| StoreError::OrderInsertFailed(e.to_string()))?;

            let item_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO order_items (order_id, product_id, product_name, quantity, price_at_purchase)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(order.id.as_str())
            .bind(item.product.id.as_i64())
            .bind(&item.product.name)
            .bind(quantity)
            .bind(item.price_at_purchase.cents())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| StoreError::OrderInsertFailed(e.to_string()))?;

            let mut product = item.product;
            if let Some(stock) = remaining.get(&product.id) {
                product.stock = *stock;
            }
            items.push(OrderItem {
                id: item_id,
                order_id: order.id.clone(),
                product_id: Some(product.id),
                product_name: product.name.clone(),
                product: Some(product),
                quantity: item.quantity,
                price_at_purchase: item.price_at_purchase,
            });
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::TransactionFailed(e.to_string()))?;

        Ok(Order {
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
            created_at,
        })
    }

    async fn list_orders(&self, page: PageRequest) -> Result<Page<Order>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        let sql = format!("{ORDER_SELECT} ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2");
        let rows = sqlx::query(&sql)
            .bind(i64::from(page.limit()))
            .bind(to_i64(page.offset()))
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: self.orders_with_items(rows).await?,
            total: total as u64,
        })
    }

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>> {
        let sql = format!("{ORDER_SELECT} WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.orders_with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn update_order_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", id));
        }
        self.get_order(id)
            .await?
            .ok_or_else(|| StoreError::not_found("order", id))
    }

    async fn delete_order(&self, id: &OrderId) -> Result<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", id));
        }
        Ok(())
    }
}
