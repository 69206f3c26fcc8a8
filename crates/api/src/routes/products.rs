//! Product endpoints. Create and update take `multipart/form-data` with an
//! `image` file; the image is mandatory on create.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use domain::{Paginated, ProductRequest, ProductView, StockRequest, Validate};
use serde::Serialize;
use store::ProductId;

use super::extract::JsonBody;
use super::form::FormData;
use super::{MessageResponse, PageQuery, parse_id};
use crate::error::ApiError;
use crate::upload::FileStorage;
use crate::{AppState, Storefront};

const IMAGE_FOLDER: &str = "products";

#[derive(Serialize)]
pub struct ProductResponse {
    pub message: &'static str,
    pub product: ProductView,
}

fn product_id(raw: &str) -> Result<ProductId, ApiError> {
    parse_id(raw, "product").map(ProductId::new)
}

fn product_request(form: &FormData) -> Result<ProductRequest, ApiError> {
    Ok(ProductRequest {
        name: form.text("name"),
        description: form.text("description"),
        price: form.number("price")?,
        stock: form.optional_number("stock")?,
        category_id: form.number("category_id")?,
    })
}

/// Removes a stored image, logging instead of failing the request.
pub(super) async fn discard_image(files: &dyn FileStorage, reference: &str) {
    if let Err(e) = files.remove(reference).await {
        tracing::warn!(error = %e, %reference, "failed to remove product image");
    }
}

/// POST /products
#[tracing::instrument(skip_all)]
pub async fn create<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    mut form: FormData,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let req = product_request(&form)?.validated()?;
    let image = form
        .take_file("image")
        .ok_or_else(|| ApiError::BadRequest("image is required".to_string()))?;

    let image_url = state.files.store(IMAGE_FOLDER, image).await?;
    match state.catalog.create_product(req, image_url.clone()).await {
        Ok(product) => Ok((
            StatusCode::CREATED,
            Json(ProductResponse {
                message: "Product created successfully",
                product,
            }),
        )),
        Err(err) => {
            discard_image(state.files.as_ref(), &image_url).await;
            Err(err.into())
        }
    }
}

/// GET /products
#[tracing::instrument(skip(state))]
pub async fn list<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<ProductView>>, ApiError> {
    let page = state.catalog.list_products(query.to_request()).await?;
    Ok(Json(page))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductView>, ApiError> {
    let product = state.catalog.get_product(product_id(&id)?).await?;
    Ok(Json(product))
}

/// PUT /products/{id}
#[tracing::instrument(skip(state, form))]
pub async fn update<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    mut form: FormData,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = product_id(&id)?;
    let req = product_request(&form)?.validated()?;

    let image_url = match form.take_file("image") {
        Some(image) => Some(state.files.store(IMAGE_FOLDER, image).await?),
        None => None,
    };

    match state
        .catalog
        .update_product(id, req, image_url.clone())
        .await
    {
        Ok(update) => {
            if let Some(old) = &update.replaced_image {
                discard_image(state.files.as_ref(), old).await;
            }
            Ok(Json(ProductResponse {
                message: "Product updated successfully",
                product: update.product,
            }))
        }
        Err(err) => {
            if let Some(new) = &image_url {
                discard_image(state.files.as_ref(), new).await;
            }
            Err(err.into())
        }
    }
}

/// PATCH /products/{id}/stock
#[tracing::instrument(skip(state, req))]
pub async fn set_stock<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<StockRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.catalog.set_stock(product_id(&id)?, req).await?;
    Ok(Json(ProductResponse {
        message: "Stock updated successfully",
        product,
    }))
}

/// DELETE /products/{id}
///
/// Order lines keep the product's name and price after deletion.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let product = state.catalog.delete_product(product_id(&id)?).await?;
    discard_image(state.files.as_ref(), &product.image_url).await;

    Ok(Json(MessageResponse {
        message: "Product deleted successfully",
    }))
}
