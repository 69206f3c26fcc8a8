//! Order workflow tests over the in-memory store.
//!
//! These cover order placement end to end: pricing, stock decrements,
//! atomicity, price freezing and behaviour under concurrent placement.

use domain::{
    CatalogService, CreateOrderRequest, DomainError, NanoIdGenerator, OrderError,
    OrderItemRequest, OrderService, ProductRequest, UpdateOrderStatusRequest,
};
use store::{
    CatalogStore, InMemoryStore, Money, NewProduct, OrderId, OrderStatus, PageRequest, Product,
    ProductId,
};

fn create_service(store: &InMemoryStore) -> OrderService<InMemoryStore> {
    OrderService::new(store.clone(), NanoIdGenerator::default())
}

async fn seed_product(store: &InMemoryStore, name: &str, stock: i32, price: i64) -> Product {
    let category = match store.create_category("General").await {
        Ok(category) => category,
        Err(_) => store
            .list_categories(PageRequest::default())
            .await
            .unwrap()
            .items
            .remove(0),
    };
    store
        .create_product(NewProduct {
            name: name.to_string(),
            description: format!("{name} description"),
            price: Money::from_cents(price),
            stock,
            category_id: category.id,
            image_url: String::new(),
        })
        .await
        .unwrap()
}

fn order_request(lines: &[(ProductId, i64)]) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_name: "Putu".to_string(),
        whatsapp: "081311112222".to_string(),
        map_address: "Jl. Kenanga 12".to_string(),
        latitude: -8.4,
        longitude: 115.2,
        address_note: "Blue gate".to_string(),
        items: lines
            .iter()
            .map(|(id, qty)| OrderItemRequest::new(id.as_i64(), *qty))
            .collect(),
    }
}

async fn stock_of(store: &InMemoryStore, id: ProductId) -> i32 {
    store.get_product(id).await.unwrap().unwrap().stock
}

mod placement {
    use super::*;

    #[tokio::test]
    async fn order_for_three_of_ten_decrements_to_seven() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "A", 10, 100).await;
        let service = create_service(&store);

        let order = service
            .create_order(order_request(&[(product.id, 3)]), "proof.png".to_string())
            .await
            .unwrap();

        assert_eq!(order.total_price, Money::from_cents(300));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(stock_of(&store, product.id).await, 7);
    }

    #[tokio::test]
    async fn quantity_above_stock_is_rejected_without_mutation() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "A", 10, 100).await;
        let service = create_service(&store);

        let result = service
            .create_order(order_request(&[(product.id, 11)]), "proof.png".to_string())
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::InsufficientStock { ref product })) if product == "A"
        ));
        assert_eq!(stock_of(&store, product.id).await, 10);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_product_aborts_whole_order() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "A", 10, 100).await;
        let service = create_service(&store);

        let result = service
            .create_order(
                order_request(&[(product.id, 1), (ProductId::new(404), 1)]),
                "proof.png".to_string(),
            )
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::ProductNotFound(id))) if id == ProductId::new(404)
        ));
        assert_eq!(stock_of(&store, product.id).await, 10);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn total_is_sum_of_lines() {
        let store = InMemoryStore::new();
        let a = seed_product(&store, "A", 10, 1_250).await;
        let b = seed_product(&store, "B", 10, 799).await;
        let c = seed_product(&store, "C", 10, 5).await;
        let service = create_service(&store);

        let order = service
            .create_order(
                order_request(&[(a.id, 2), (b.id, 3), (c.id, 7)]),
                "proof.png".to_string(),
            )
            .await
            .unwrap();

        let expected: Money = order
            .order_items
            .iter()
            .map(|item| item.price_at_purchase.multiply(item.quantity))
            .sum();
        assert_eq!(order.total_price, expected);
        assert_eq!(order.total_price, Money::from_cents(2_500 + 2_397 + 35));

        let names: Vec<_> = order
            .order_items
            .iter()
            .map(|item| item.product_name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }
}

mod atomicity {
    use super::*;

    #[tokio::test]
    async fn failed_stock_update_leaves_no_trace() {
        let store = InMemoryStore::new();
        let a = seed_product(&store, "A", 10, 100).await;
        let b = seed_product(&store, "B", 10, 100).await;
        store.fail_stock_update_for(b.id).await;
        let service = create_service(&store);

        let result = service
            .create_order(order_request(&[(a.id, 4), (b.id, 4)]), "proof.png".to_string())
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::TransactionFailed(_)))
        ));
        assert_eq!(stock_of(&store, a.id).await, 10);
        assert_eq!(stock_of(&store, b.id).await, 10);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn failed_order_insert_restores_nothing_because_nothing_changed() {
        let store = InMemoryStore::new();
        let a = seed_product(&store, "A", 10, 100).await;
        store.set_fail_on_order_insert(true).await;
        let service = create_service(&store);

        let result = service
            .create_order(order_request(&[(a.id, 10)]), "proof.png".to_string())
            .await;

        assert!(result.is_err());
        assert_eq!(stock_of(&store, a.id).await, 10);
    }
}

mod history {
    use super::*;

    #[tokio::test]
    async fn price_changes_do_not_touch_existing_orders() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "A", 10, 100).await;
        let orders = create_service(&store);
        let catalog = CatalogService::new(store.clone());

        let placed = orders
            .create_order(order_request(&[(product.id, 2)]), "proof.png".to_string())
            .await
            .unwrap();

        catalog
            .update_product(
                product.id,
                ProductRequest {
                    name: "A renamed".to_string(),
                    description: "A description".to_string(),
                    price: 999,
                    stock: Some(8),
                    category_id: product.category_id().as_i64(),
                },
                None,
            )
            .await
            .unwrap();

        let loaded = orders.get_order(&placed.id).await.unwrap();
        assert_eq!(loaded.order_items[0].price_at_purchase, Money::from_cents(100));
        assert_eq!(loaded.total_price, Money::from_cents(200));
        assert_eq!(
            loaded.order_items[0].product.as_ref().unwrap().price,
            Money::from_cents(999)
        );
    }

    #[tokio::test]
    async fn get_order_is_a_pure_read() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "A", 10, 100).await;
        let service = create_service(&store);

        let placed = service
            .create_order(order_request(&[(product.id, 1)]), "proof.png".to_string())
            .await
            .unwrap();

        let first = service.get_order(&placed.id).await.unwrap();
        let second = service.get_order(&placed.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, placed);
    }

    #[tokio::test]
    async fn status_moves_freely_between_values() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "A", 10, 100).await;
        let service = create_service(&store);
        let placed = service
            .create_order(order_request(&[(product.id, 1)]), "proof.png".to_string())
            .await
            .unwrap();

        let order = service
            .update_order_status(&placed.id, UpdateOrderStatusRequest::new("success"))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Success);

        let order = service
            .update_order_status(&placed.id, UpdateOrderStatusRequest::new("rejected"))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Rejected);

        let order = service
            .update_order_status(&placed.id, UpdateOrderStatusRequest::new("rejected"))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Rejected);
    }

    #[tokio::test]
    async fn unknown_status_is_a_validation_error() {
        let store = InMemoryStore::new();
        let service = create_service(&store);

        let result = service
            .update_order_status(&OrderId::new("any"), UpdateOrderStatusRequest::new("paid"))
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn delete_removes_order_without_restoring_stock() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "A", 10, 100).await;
        let service = create_service(&store);
        let placed = service
            .create_order(order_request(&[(product.id, 4)]), "proof.png".to_string())
            .await
            .unwrap();

        service.delete_order(&placed.id).await.unwrap();

        assert!(matches!(
            service.get_order(&placed.id).await,
            Err(DomainError::Order(OrderError::OrderNotFound(_)))
        ));
        assert!(matches!(
            service.delete_order(&placed.id).await,
            Err(DomainError::Order(OrderError::OrderNotFound(_)))
        ));
        assert_eq!(stock_of(&store, product.id).await, 6);
    }

    #[tokio::test]
    async fn deleted_products_stay_in_order_history() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "A", 10, 100).await;
        let service = create_service(&store);
        let placed = service
            .create_order(order_request(&[(product.id, 1)]), "proof.png".to_string())
            .await
            .unwrap();

        store.delete_product(product.id).await.unwrap();

        let loaded = service.get_order(&placed.id).await.unwrap();
        assert_eq!(loaded.order_items.len(), 1);
        assert_eq!(loaded.order_items[0].product_name, "A");
        assert!(loaded.order_items[0].product.is_none());
        assert_eq!(loaded.total_price, Money::from_cents(100));
    }

    #[tokio::test]
    async fn listing_is_newest_first_with_metadata() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "A", 10, 100).await;
        let service = create_service(&store);

        let mut ids = Vec::new();
        for _ in 0..3 {
            let order = service
                .create_order(order_request(&[(product.id, 1)]), "proof.png".to_string())
                .await
                .unwrap();
            ids.push(order.id);
        }

        let page = service.list_orders(PageRequest::new(1, 2)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 2);
        assert_eq!(page.data[0].id, ids[2]);
        assert_eq!(page.data[1].id, ids[1]);
    }
}

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn two_orders_for_more_than_stock_never_both_succeed() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "A", 10, 100).await;
        let service = create_service(&store);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let service = service.clone();
                let id = product.id;
                tokio::spawn(async move {
                    service
                        .create_order(order_request(&[(id, 6)]), "proof.png".to_string())
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        let mut rejections = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(DomainError::Order(OrderError::InsufficientStock { .. })) => rejections += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(rejections, 1);
        assert_eq!(stock_of(&store, product.id).await, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stock_never_goes_negative_under_contention() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "A", 10, 100).await;
        let service = create_service(&store);

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let service = service.clone();
                let id = product.id;
                tokio::spawn(async move {
                    service
                        .create_order(order_request(&[(id, 1)]), "proof.png".to_string())
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 10);
        assert_eq!(stock_of(&store, product.id).await, 0);
        assert_eq!(store.order_count().await, 10);
    }
}
