//! Category endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use domain::{CategoryRequest, CategoryView, Paginated};
use serde::Serialize;
use store::CategoryId;

use super::extract::JsonBody;
use super::products::discard_image;
use super::{MessageResponse, PageQuery, parse_id};
use crate::error::ApiError;
use crate::{AppState, Storefront};

#[derive(Serialize)]
pub struct CategoryResponse {
    pub message: &'static str,
    pub category: CategoryView,
}

fn category_id(raw: &str) -> Result<CategoryId, ApiError> {
    parse_id(raw, "category").map(CategoryId::new)
}

/// POST /categories
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(req): JsonBody<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let category = state.catalog.create_category(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse {
            message: "Category created successfully",
            category,
        }),
    ))
}

/// GET /categories
#[tracing::instrument(skip(state))]
pub async fn list<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<CategoryView>>, ApiError> {
    let page = state.catalog.list_categories(query.to_request()).await?;
    Ok(Json(page))
}

/// GET /categories/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CategoryView>, ApiError> {
    let category = state.catalog.get_category(category_id(&id)?).await?;
    Ok(Json(category))
}

/// PUT /categories/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CategoryRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = state
        .catalog
        .update_category(category_id(&id)?, req)
        .await?;
    Ok(Json(CategoryResponse {
        message: "Category updated successfully",
        category,
    }))
}

/// DELETE /categories/{id}
///
/// Products of the category are deleted with it, and so are their images.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let images = state.catalog.delete_category(category_id(&id)?).await?;
    for image in &images {
        discard_image(state.files.as_ref(), image).await;
    }
    Ok(Json(MessageResponse {
        message: "Category deleted successfully",
    }))
}
