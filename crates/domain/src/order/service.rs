//! Order service implementing the order placement workflow.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use store::{
    CatalogStore, Money, NewOrder, NewOrderItem, OrderId, OrderStatus, OrderStore, PageRequest,
    ProductId, StockAdjustment, StoreError,
};

use crate::error::DomainError;
use crate::id::IdGenerator;
use crate::validation::Validate;
use crate::views::{OrderView, Paginated};

use super::{CreateOrderRequest, OrderError, UpdateOrderStatusRequest};

/// Service for placing and administering orders.
///
/// Order placement reads every referenced product, prices the lines from that
/// snapshot and hands the order together with its stock adjustments to the
/// store as one atomic write.
pub struct OrderService<S> {
    store: S,
    ids: Arc<dyn IdGenerator>,
}

impl<S: Clone> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ids: Arc::clone(&self.ids),
        }
    }
}

impl<S> OrderService<S>
where
    S: CatalogStore + OrderStore,
{
    /// Creates a new order service.
    pub fn new(store: S, ids: impl IdGenerator + 'static) -> Self {
        Self {
            store,
            ids: Arc::new(ids),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order and decrements stock for every line.
    ///
    /// `proof_of_payment` is an already stored reference and is kept as is.
    #[tracing::instrument(skip(self, request, proof_of_payment), fields(items = request.items.len()))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        proof_of_payment: String,
    ) -> Result<OrderView, DomainError> {
        let started = Instant::now();
        let result = self.place_order(request, proof_of_payment).await;
        metrics::histogram!("order_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(order_id = %order.id, total = %order.total_price, "order created");
            }
            Err(e) => {
                metrics::counter!("orders_failed_total", "reason" => failure_reason(e))
                    .increment(1);
                tracing::warn!(error = %e, "order rejected");
            }
        }
        result
    }

    async fn place_order(
        &self,
        request: CreateOrderRequest,
        proof_of_payment: String,
    ) -> Result<OrderView, DomainError> {
        let request = request.validated()?;
        let order_id = self.ids.generate().map_err(OrderError::from)?;

        // Stock left per product after the lines seen so far, so repeated
        // lines for one product are checked against each other.
        let mut remaining: HashMap<ProductId, i32> = HashMap::new();
        let mut names: HashMap<ProductId, String> = HashMap::new();
        let mut items = Vec::with_capacity(request.items.len());
        let mut adjustments = Vec::with_capacity(request.items.len());
        let mut total_price = Money::zero();

        for line in &request.items {
            let product_id = ProductId::new(line.product_id);
            // Validated to 1..=100.
            let quantity = line.quantity as u32;

            let product = self
                .store
                .get_product(product_id)
                .await?
                .ok_or(OrderError::ProductNotFound(product_id))?;

            let available = remaining.get(&product_id).copied().unwrap_or(product.stock);
            if available < quantity as i32 {
                return Err(OrderError::InsufficientStock {
                    product: product.name,
                }
                .into());
            }
            let new_stock = available - quantity as i32;
            remaining.insert(product_id, new_stock);
            names.insert(product_id, product.name.clone());

            total_price += product.price.multiply(quantity);
            adjustments.push(StockAdjustment {
                product_id,
                quantity,
                new_stock,
            });
            items.push(NewOrderItem {
                price_at_purchase: product.price,
                quantity,
                product,
            });
        }

        let order = NewOrder {
            id: order_id,
            customer_name: request.customer_name,
            whatsapp: request.whatsapp,
            map_address: request.map_address,
            latitude: request.latitude,
            longitude: request.longitude,
            address_note: request.address_note,
            total_price,
            proof_of_payment,
            status: OrderStatus::Pending,
            items,
        };

        let order = self
            .store
            .create_order_with_stock_adjustment(order, adjustments)
            .await
            .map_err(|e| match e {
                // Another order took the stock between our read and the write.
                StoreError::InsufficientStock { product_id, .. } => OrderError::InsufficientStock {
                    product: names
                        .remove(&product_id)
                        .unwrap_or_else(|| product_id.to_string()),
                },
                other => {
                    tracing::error!(error = %other, "order transaction failed");
                    OrderError::TransactionFailed(other.to_string())
                }
            })?;

        Ok(OrderView::from(&order))
    }

    /// Lists orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, page: PageRequest) -> Result<Paginated<OrderView>, DomainError> {
        let orders = self.store.list_orders(page).await?;
        Ok(Paginated::from_page(&orders, page))
    }

    /// Loads an order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: &OrderId) -> Result<OrderView, DomainError> {
        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(id.clone()))?;
        Ok(OrderView::from(&order))
    }

    /// Sets the status of an order. Any status may follow any other.
    #[tracing::instrument(skip(self, request))]
    pub async fn update_order_status(
        &self,
        id: &OrderId,
        request: UpdateOrderStatusRequest,
    ) -> Result<OrderView, DomainError> {
        let status = request.validated()?.status()?;
        let order = self
            .store
            .update_order_status(id, status)
            .await
            .map_err(|e| missing_order(e, id))?;

        tracing::info!(order_id = %id, %status, "order status updated");
        Ok(OrderView::from(&order))
    }

    /// Deletes an order and its items. Stock is not restored.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, id: &OrderId) -> Result<(), DomainError> {
        self.store
            .delete_order(id)
            .await
            .map_err(|e| missing_order(e, id))?;

        tracing::info!(order_id = %id, "order deleted");
        Ok(())
    }
}

fn missing_order(err: StoreError, id: &OrderId) -> DomainError {
    match err {
        StoreError::NotFound { .. } => OrderError::OrderNotFound(id.clone()).into(),
        other => other.into(),
    }
}

/// Metric label for a failed order placement.
fn failure_reason(err: &DomainError) -> &'static str {
    match err {
        DomainError::Validation(_) => "validation",
        DomainError::Order(OrderError::ProductNotFound(_)) => "product_not_found",
        DomainError::Order(OrderError::InsufficientStock { .. }) => "insufficient_stock",
        DomainError::Order(OrderError::TransactionFailed(_)) => "transaction_failed",
        DomainError::Order(OrderError::IdentifierGenerationFailed(_)) => "identifier",
        _ => "storage",
    }
}
