//! Order placement and administration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use domain::{
    CreateOrderRequest, OrderItemRequest, OrderView, Paginated, UpdateOrderStatusRequest, Validate,
};
use serde::Serialize;
use store::OrderId;

use super::extract::JsonBody;
use super::form::FormData;
use super::{MessageResponse, PageQuery};
use crate::auth::AdminSession;
use crate::error::ApiError;
use crate::{AppState, Storefront};

const PROOF_FOLDER: &str = "payment_proofs";

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub message: &'static str,
    pub order: OrderView,
}

#[derive(Serialize)]
pub struct OrderDetail {
    pub order: OrderView,
}

// -- Handlers --

/// Decodes the `items` form field, which carries a JSON array.
fn parse_items(raw: &str) -> Result<Vec<OrderItemRequest>, ApiError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
        .map_err(|_| ApiError::BadRequest("items must be a valid JSON array".to_string()))
}

fn order_request(form: &FormData) -> Result<CreateOrderRequest, ApiError> {
    Ok(CreateOrderRequest {
        customer_name: form.text("customer_name"),
        whatsapp: form.text("whatsapp"),
        map_address: form.text("map_address"),
        latitude: form.number("latitude")?,
        longitude: form.number("longitude")?,
        address_note: form.text("address_note"),
        items: parse_items(&form.text("items"))?,
    })
}

/// POST /orders
///
/// The request is validated before the proof of payment is stored. If the
/// order cannot be placed the stored proof is removed again.
#[tracing::instrument(skip_all)]
pub async fn create<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    mut form: FormData,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let req = order_request(&form)?.validated()?;
    let proof = form
        .take_file("proof_of_payment")
        .ok_or_else(|| ApiError::BadRequest("proof of payment is required".to_string()))?;

    let proof_url = state.files.store(PROOF_FOLDER, proof).await?;
    match state.orders.create_order(req, proof_url.clone()).await {
        Ok(order) => Ok((
            StatusCode::CREATED,
            Json(OrderResponse {
                message: "Order created successfully",
                order,
            }),
        )),
        Err(err) => {
            if let Err(e) = state.files.remove(&proof_url).await {
                tracing::warn!(error = %e, reference = %proof_url, "failed to remove proof of payment");
            }
            Err(err.into())
        }
    }
}

/// GET /orders
#[tracing::instrument(skip(state))]
pub async fn list<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<OrderView>>, ApiError> {
    let page = state.orders.list_orders(query.to_request()).await?;
    Ok(Json(page))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    let order = state.orders.get_order(&OrderId::new(id)).await?;
    Ok(Json(OrderDetail { order }))
}

/// PUT /orders/{id}/status
#[tracing::instrument(skip(state, session, req), fields(admin = %session.username))]
pub async fn update_status<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateOrderStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .update_order_status(&OrderId::new(id), req)
        .await?;
    Ok(Json(OrderResponse {
        message: "Order status updated successfully",
        order,
    }))
}

/// DELETE /orders/{id}
///
/// Stock consumed by the order is not returned.
#[tracing::instrument(skip(state, session), fields(admin = %session.username))]
pub async fn delete<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.orders.delete_order(&OrderId::new(id)).await?;
    Ok(Json(MessageResponse {
        message: "order deleted successfully",
    }))
}
