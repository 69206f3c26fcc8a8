//! HTTP API server for the storefront.
//!
//! Exposes the catalog, order placement and admin endpoints, with structured
//! logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod upload;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, patch, post, put};
use domain::{CatalogService, NanoIdGenerator, OrderService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{CatalogStore, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use auth::{Authenticator, RateLimiter};
use config::Config;
use upload::{FileStorage, LocalFileStorage, UPLOADS_ROUTE};

/// Room for the text fields of a multipart request on top of its file.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// A store usable by every handler.
pub trait Storefront: CatalogStore + OrderStore + Clone + 'static {}

impl<T> Storefront for T where T: CatalogStore + OrderStore + Clone + 'static {}

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub orders: OrderService<S>,
    pub catalog: CatalogService<S>,
    pub auth: Authenticator,
    pub login_limiter: RateLimiter,
    pub files: Arc<dyn FileStorage>,
}

impl<S: Storefront> AppState<S> {
    /// Builds the state with uploads written to the configured directory.
    pub fn new(store: S, config: &Config) -> Self {
        let files = LocalFileStorage::new(
            &config.upload_dir,
            &config.public_base_url,
            config.max_upload_bytes,
        );
        Self::with_file_storage(store, config, Arc::new(files))
    }

    pub fn with_file_storage(store: S, config: &Config, files: Arc<dyn FileStorage>) -> Self {
        Self {
            orders: OrderService::new(
                store.clone(),
                NanoIdGenerator::new(config.order_id_length),
            ),
            catalog: CatalogService::new(store),
            auth: Authenticator::new(config),
            login_limiter: RateLimiter::per_minute(config.login_rate_limit_per_minute),
            files,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Storefront>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    config: &Config,
) -> Router {
    use routes::{auth as login, categories, health, metrics, orders, products};

    let metrics_router = Router::new()
        .route("/metrics", get(metrics::get))
        .with_state(metrics_handle);

    let admin = Router::new()
        .route("/categories", post(categories::create::<S>))
        .route(
            "/categories/{id}",
            put(categories::update::<S>).delete(categories::delete::<S>),
        )
        .route("/products", post(products::create::<S>))
        .route(
            "/products/{id}",
            put(products::update::<S>).delete(products::delete::<S>),
        )
        .route("/products/{id}/stock", patch(products::set_stock::<S>))
        .route("/orders", get(orders::list::<S>))
        .route(
            "/orders/{id}",
            axum::routing::delete(orders::delete::<S>),
        )
        .route("/orders/{id}/status", put(orders::update_status::<S>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer::<S>,
        ));

    let sign_in = Router::new()
        .route("/login", post(login::login::<S>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::limit_login::<S>,
        ));

    let public = Router::new()
        .route("/health", get(health::check))
        .route("/refresh-token", post(login::refresh::<S>))
        .route("/categories", get(categories::list::<S>))
        .route("/categories/{id}", get(categories::get::<S>))
        .route("/products", get(products::list::<S>))
        .route("/products/{id}", get(products::get::<S>))
        .route("/orders", post(orders::create::<S>))
        .route("/orders/{id}", get(orders::get::<S>));

    public
        .merge(sign_in)
        .merge(admin)
        .with_state(state)
        .nest_service(UPLOADS_ROUTE, ServeDir::new(&config.upload_dir))
        .merge(metrics_router)
        .layer(DefaultBodyLimit::max(
            config.max_upload_bytes + FORM_OVERHEAD_BYTES,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
