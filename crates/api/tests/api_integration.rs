//! Integration tests for the API server.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use api::AppState;
use api::config::Config;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use domain::{CategoryRequest, ProductRequest};
use metrics_exporter_prometheus::PrometheusHandle;
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    router: axum::Router,
    state: Arc<AppState<InMemoryStore>>,
    upload_dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn token(&self) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/login",
                None,
                serde_json::json!({ "username": "admin", "password": "secret" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Seeds a product through the service and returns its id.
    async fn seed_product(&self, name: &str, price: i64, stock: i64) -> i64 {
        let category = self
            .state
            .catalog
            .create_category(CategoryRequest::new(format!("{name} category")))
            .await
            .unwrap();
        let product = self
            .state
            .catalog
            .create_product(
                ProductRequest {
                    name: name.to_string(),
                    description: "A product used in API tests".to_string(),
                    price,
                    stock: Some(stock),
                    category_id: category.id.as_i64(),
                },
                String::new(),
            )
            .await
            .unwrap();
        product.id.as_i64()
    }

    fn stored_files(&self, folder: &str) -> usize {
        std::fs::read_dir(self.upload_dir.join(folder))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn setup_with(config: impl FnOnce(&mut Config)) -> TestApp {
    let upload_dir =
        std::env::temp_dir().join(format!("storefront-api-{}", uuid::Uuid::new_v4()));
    let mut cfg = Config {
        admin_username: "admin".to_string(),
        admin_password: "secret".to_string(),
        upload_dir: upload_dir.clone(),
        public_base_url: "http://shop.test".to_string(),
        ..Config::default()
    };
    config(&mut cfg);

    let state = Arc::new(AppState::new(InMemoryStore::new(), &cfg));
    let router = api::create_app(state.clone(), get_metrics_handle(), &cfg);
    TestApp {
        router,
        state,
        upload_dir,
    }
}

fn setup() -> TestApp {
    setup_with(|_| {})
}

async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn authorized(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Hand-built `multipart/form-data` body.
struct Form {
    parts: Vec<u8>,
}

const BOUNDARY: &str = "storefront-test-boundary";

impl Form {
    fn new() -> Self {
        Self { parts: Vec::new() }
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.parts.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, name: &str, file_name: &str, bytes: &[u8]) -> Self {
        self.parts.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.parts.extend_from_slice(bytes);
        self.parts.extend_from_slice(b"\r\n");
        self
    }

    fn request(mut self, method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
        self.parts
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(self.parts)).unwrap()
    }
}

fn order_form(items: &str) -> Form {
    Form::new()
        .text("customer_name", "Budi Santoso")
        .text("whatsapp", "081234567890")
        .text("map_address", "Jl. Merdeka 1")
        .text("latitude", "-6.2")
        .text("longitude", "106.8")
        .text("items", items)
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let response = app.send(get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();

    let response = app.send(get("/metrics")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = setup();

    let response = app
        .send(json_request(
            "POST",
            "/categories",
            None,
            serde_json::json!({ "name": "Coffee" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "missing or malformed authorization header");

    let response = app.send(authorized("GET", "/orders", "not-a-token")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Reads on the same paths stay public.
    let response = app.send(get("/categories")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_and_refresh() {
    let app = setup();

    let response = app
        .send(json_request(
            "POST",
            "/login",
            None,
            serde_json::json!({ "username": "admin", "password": "wrong" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(json_request(
            "POST",
            "/login",
            None,
            serde_json::json!({ "username": "admin", "password": "secret" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Login successful");
    let refresh_token = json["refresh_token"].as_str().unwrap().to_string();

    let response = app
        .send(json_request(
            "POST",
            "/refresh-token",
            None,
            serde_json::json!({ "refresh_token": refresh_token }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let access_token = body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app.send(authorized("GET", "/orders", &access_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let app = setup_with(|cfg| cfg.login_rate_limit_per_minute = 2);

    let attempt = || {
        Request::builder()
            .method("POST")
            .uri("/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from(
                serde_json::json!({ "username": "admin", "password": "wrong" }).to_string(),
            ))
            .unwrap()
    };

    assert_eq!(app.send(attempt()).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.send(attempt()).await.status(), StatusCode::UNAUTHORIZED);
    let response = app.send(attempt()).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(response).await;
    assert_eq!(json["error"], "too many login attempts, try again later");
}

#[tokio::test]
async fn test_category_crud() {
    let app = setup();
    let token = app.token().await;

    let response = app
        .send(json_request(
            "POST",
            "/categories",
            Some(&token),
            serde_json::json!({ "name": "  Coffee  " }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Category created successfully");
    assert_eq!(json["category"]["name"], "Coffee");
    let id = json["category"]["id"].as_i64().unwrap();

    let response = app
        .send(json_request(
            "POST",
            "/categories",
            Some(&token),
            serde_json::json!({ "name": "Coffee" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .send(json_request(
            "PUT",
            &format!("/categories/{id}"),
            Some(&token),
            serde_json::json!({ "name": "Tea" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["category"]["name"], "Tea");

    let response = app.send(get(&format!("/categories/{id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "Tea");

    let response = app
        .send(authorized("DELETE", &format!("/categories/{id}"), &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Category deleted successfully"
    );

    let response = app.send(get(&format!("/categories/{id}"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_category_validation_errors() {
    let app = setup();
    let token = app.token().await;

    let response = app
        .send(json_request(
            "POST",
            "/categories",
            Some(&token),
            serde_json::json!({ "name": "   " }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "validation error");
    assert_eq!(json["errors"]["name"], "field is required");
}

#[tokio::test]
async fn test_pagination_falls_back_to_defaults() {
    let app = setup();
    for name in ["A", "B", "C"] {
        app.state
            .catalog
            .create_category(CategoryRequest::new(name))
            .await
            .unwrap();
    }

    let response = app.send(get("/categories?page=abc&limit=-5")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["page"], 1);
    assert_eq!(json["limit"], 10);
    assert_eq!(json["total"], 3);
    assert_eq!(json["data"].as_array().unwrap().len(), 3);

    let json = body_json(app.send(get("/categories?page=2&limit=2")).await).await;
    assert_eq!(json["page"], 2);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_product_lifecycle_with_image() {
    let app = setup();
    let token = app.token().await;
    let category = app
        .state
        .catalog
        .create_category(CategoryRequest::new("Coffee"))
        .await
        .unwrap();
    let category_id = category.id.as_i64().to_string();

    let product_form = || {
        Form::new()
            .text("name", "Kopi Gayo")
            .text("description", "Arabica from the Gayo highlands")
            .text("price", "85000")
            .text("stock", "0")
            .text("category_id", &category_id)
    };

    let response = app
        .send(product_form().request("POST", "/products", Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "image is required");

    let response = app
        .send(
            product_form()
                .file("image", "gayo.jpg", b"jpeg bytes")
                .request("POST", "/products", Some(&token)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Product created successfully");
    assert_eq!(json["product"]["stock"], 0);
    assert_eq!(json["product"]["category"]["name"], "Coffee");
    let image_url = json["product"]["image_url"].as_str().unwrap().to_string();
    assert!(image_url.starts_with("http://shop.test/uploads/products/"));
    let id = json["product"]["id"].as_i64().unwrap();
    assert_eq!(app.stored_files("products"), 1);

    // The stored image is served back.
    let path = image_url.trim_start_matches("http://shop.test");
    let response = app.send(get(path)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(
            product_form()
                .text("stock", "12")
                .file("image", "gayo-new.png", b"png bytes")
                .request("PUT", &format!("/products/{id}"), Some(&token)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["product"]["stock"], 12);
    assert_ne!(json["product"]["image_url"], image_url);
    // The replaced image is gone.
    assert_eq!(app.stored_files("products"), 1);

    let response = app
        .send(json_request(
            "PATCH",
            &format!("/products/{id}/stock"),
            Some(&token),
            serde_json::json!({ "stock": 4 }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["product"]["stock"], 4);

    let response = app
        .send(authorized("DELETE", &format!("/products/{id}"), &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.stored_files("products"), 0);

    let response = app.send(get(&format!("/products/{id}"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_validation_and_ids() {
    let app = setup();
    let token = app.token().await;

    let response = app
        .send(
            Form::new()
                .text("name", "X")
                .text("price", "cheap")
                .request("POST", "/products", Some(&token)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["errors"]["price"], "must be a number");

    let response = app
        .send(
            Form::new()
                .text("name", "X")
                .request("POST", "/products", Some(&token)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["errors"]["name"], "minimum length is 2");
    assert_eq!(json["errors"]["stock"], "field is required");

    let response = app.send(get("/products/abc")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid product id");

    let response = app.send(get("/products/999")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_order_decrements_stock() {
    let app = setup();
    let tea = app.seed_product("Tea", 1500, 5).await;

    let items = format!(r#"[{{"product_id":{tea},"quantity":2}}]"#);
    let response = app
        .send(
            order_form(&items)
                .file("proof_of_payment", "transfer.png", b"receipt")
                .request("POST", "/orders", None),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Order created successfully");
    let order = &json["order"];
    assert_eq!(order["total_price"], 3000);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["order_items"][0]["quantity"], 2);
    assert_eq!(order["order_items"][0]["price_at_purchase"], 1500);
    assert!(
        order["proof_of_payment"]
            .as_str()
            .unwrap()
            .starts_with("http://shop.test/uploads/payment_proofs/")
    );
    let order_id = order["id"].as_str().unwrap().to_string();
    assert_eq!(order_id.len(), 21);

    let product = body_json(app.send(get(&format!("/products/{tea}"))).await).await;
    assert_eq!(product["stock"], 3);

    let response = app.send(get(&format!("/orders/{order_id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["order"]["id"], order_id.as_str());
}

#[tokio::test]
async fn test_insufficient_stock_is_conflict() {
    let app = setup();
    let tea = app.seed_product("Tea", 1500, 3).await;

    let items = format!(r#"[{{"product_id":{tea},"quantity":10}}]"#);
    let response = app
        .send(
            order_form(&items)
                .file("proof_of_payment", "transfer.png", b"receipt")
                .request("POST", "/orders", None),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Insufficient stock for product Tea");

    let product = body_json(app.send(get(&format!("/products/{tea}"))).await).await;
    assert_eq!(product["stock"], 3);
    // The stored proof was removed again.
    assert_eq!(app.stored_files("payment_proofs"), 0);
}

#[tokio::test]
async fn test_unknown_product_in_order() {
    let app = setup();

    let response = app
        .send(
            order_form(r#"[{"product_id":404,"quantity":1}]"#)
                .file("proof_of_payment", "transfer.png", b"receipt")
                .request("POST", "/orders", None),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Product not found: 404");
}

#[tokio::test]
async fn test_order_request_errors() {
    let app = setup();
    let tea = app.seed_product("Tea", 1500, 5).await;

    let response = app
        .send(
            order_form("not json")
                .file("proof_of_payment", "transfer.png", b"receipt")
                .request("POST", "/orders", None),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "items must be a valid JSON array"
    );

    let items = format!(r#"[{{"product_id":{tea},"quantity":1}}]"#);
    let response = app
        .send(order_form(&items).request("POST", "/orders", None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "proof of payment is required"
    );

    let response = app
        .send(
            Form::new()
                .text("whatsapp", "123")
                .text("items", "[]")
                .file("proof_of_payment", "transfer.png", b"receipt")
                .request("POST", "/orders", None),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "validation error");
    assert_eq!(json["errors"]["customer_name"], "field is required");
    assert_eq!(json["errors"]["whatsapp"], "minimum length is 10");
    assert_eq!(json["errors"]["items"], "field is required");

    let response = app
        .send(
            order_form(&items)
                .file("proof_of_payment", "transfer.exe", b"receipt")
                .request("POST", "/orders", None),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was stored and no stock was taken.
    assert_eq!(app.stored_files("payment_proofs"), 0);
    let product = body_json(app.send(get(&format!("/products/{tea}"))).await).await;
    assert_eq!(product["stock"], 5);
}

#[tokio::test]
async fn test_order_administration() {
    let app = setup();
    let token = app.token().await;
    let tea = app.seed_product("Tea", 1500, 5).await;

    let items = format!(r#"[{{"product_id":{tea},"quantity":1}}]"#);
    let response = app
        .send(
            order_form(&items)
                .file("proof_of_payment", "transfer.jpg", b"receipt")
                .request("POST", "/orders", None),
        )
        .await;
    let order_id = body_json(response).await["order"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app.send(authorized("GET", "/orders", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["total"], 1);

    let response = app
        .send(json_request(
            "PUT",
            &format!("/orders/{order_id}/status"),
            Some(&token),
            serde_json::json!({ "status": "shipped" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            "PUT",
            &format!("/orders/{order_id}/status"),
            Some(&token),
            serde_json::json!({ "status": "success" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Order status updated successfully");
    assert_eq!(json["order"]["status"], "success");

    let response = app
        .send(authorized("DELETE", &format!("/orders/{order_id}"), &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "order deleted successfully"
    );

    let response = app.send(get(&format!("/orders/{order_id}"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Deleting an order does not return its stock.
    let product = body_json(app.send(get(&format!("/products/{tea}"))).await).await;
    assert_eq!(product["stock"], 4);
}

fn raw_request(
    method: &str,
    uri: &str,
    token: &str,
    content_type: &str,
    body: &str,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", content_type)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn assert_json_error(response: Response, message: &str) {
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("application/json"), "{content_type}");
    assert_eq!(body_json(response).await["error"], message);
}

#[tokio::test]
async fn test_malformed_bodies_are_json_errors() {
    let app = setup();
    let token = app.token().await;

    let response = app
        .send(raw_request(
            "PUT",
            "/orders/abc/status",
            &token,
            "application/json",
            "{\"status\":",
        ))
        .await;
    assert_json_error(response, "request body must be valid JSON").await;

    let response = app
        .send(raw_request(
            "POST",
            "/categories",
            &token,
            "application/json",
            r#"{"name":5}"#,
        ))
        .await;
    assert_json_error(response, "request body has missing or mistyped fields").await;

    let response = app
        .send(raw_request(
            "POST",
            "/categories",
            &token,
            "text/plain",
            r#"{"name":"Tea"}"#,
        ))
        .await;
    assert_json_error(response, "content type must be application/json").await;

    let response = app
        .send(raw_request(
            "POST",
            "/orders",
            &token,
            "application/json",
            r#"{"customer_name":"Budi"}"#,
        ))
        .await;
    assert_json_error(response, "content type must be multipart/form-data").await;
    assert_eq!(app.stored_files("payment_proofs"), 0);

    let response = app
        .send(raw_request(
            "POST",
            "/orders",
            &token,
            &format!("multipart/form-data; boundary={BOUNDARY}"),
            &format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"customer_name\"\r\n\r\nBudi"
            ),
        ))
        .await;
    assert_json_error(response, "request body is not valid multipart/form-data").await;
}

#[tokio::test]
async fn test_deleting_category_removes_product_images() {
    let app = setup();
    let token = app.token().await;
    let category = app
        .state
        .catalog
        .create_category(CategoryRequest::new("Coffee"))
        .await
        .unwrap();
    let category_id = category.id.as_i64().to_string();

    for (name, file) in [("Kopi Gayo", "gayo.jpg"), ("Kopi Toraja", "toraja.png")] {
        let response = app
            .send(
                Form::new()
                    .text("name", name)
                    .text("description", "Single origin beans")
                    .text("price", "85000")
                    .text("stock", "3")
                    .text("category_id", &category_id)
                    .file("image", file, b"image bytes")
                    .request("POST", "/products", Some(&token)),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    assert_eq!(app.stored_files("products"), 2);

    let response = app
        .send(authorized(
            "DELETE",
            &format!("/categories/{category_id}"),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Category deleted successfully"
    );
    assert_eq!(app.stored_files("products"), 0);

    let response = app.send(get("/products")).await;
    assert_eq!(body_json(response).await["total"], 0);
}
