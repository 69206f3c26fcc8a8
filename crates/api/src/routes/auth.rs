//! Login and token refresh endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::Validate;
use serde::Serialize;

use super::extract::JsonBody;
use crate::auth::{LoginRequest, RefreshRequest};
use crate::error::ApiError;
use crate::{AppState, Storefront};

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub refresh_token: String,
    pub access_token: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// POST /login
#[tracing::instrument(skip_all)]
pub async fn login<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let req = req.validated()?;
    let tokens = match state.auth.login(&req.username, &req.password).await {
        Ok(tokens) => tokens,
        Err(err) => {
            metrics::counter!("admin_logins_total", "outcome" => "rejected").increment(1);
            return Err(err.into());
        }
    };
    metrics::counter!("admin_logins_total", "outcome" => "success").increment(1);

    Ok(Json(LoginResponse {
        message: "Login successful",
        refresh_token: tokens.refresh_token,
        access_token: tokens.access_token,
    }))
}

/// POST /refresh-token
#[tracing::instrument(skip_all)]
pub async fn refresh<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let req = req.validated()?;
    let access_token = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(RefreshResponse { access_token }))
}
