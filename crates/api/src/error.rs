//! API error types with HTTP response mapping.

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CatalogError, DomainError, OrderError, ValidationErrors};

use crate::auth::AuthError;
use crate::upload::UploadError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Field-level validation failures.
    Validation(ValidationErrors),
    /// Missing or invalid credentials.
    Unauthorized(String),
    /// The client exceeded a rate limit.
    TooManyRequests(String),
    /// The request body exceeded the configured limit.
    PayloadTooLarge(String),
    /// Domain logic error.
    Domain(DomainError),
    /// File storage error.
    Upload(UploadError),
}

const INTERNAL_MESSAGE: &str = "internal server error";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Validation(errors) => return validation_response(errors),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::Domain(DomainError::Validation(errors)) => return validation_response(errors),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Upload(err) if err.is_client_error() => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Upload(err) => {
                tracing::error!(error = %err, "file storage failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

fn validation_response(errors: ValidationErrors) -> Response {
    let body = serde_json::json!({
        "message": "validation error",
        "errors": errors,
    });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::Order(order_err) => match order_err {
            OrderError::ProductNotFound(_) | OrderError::OrderNotFound(_) => {
                (StatusCode::NOT_FOUND, order_err.to_string())
            }
            OrderError::InsufficientStock { .. } => (StatusCode::CONFLICT, order_err.to_string()),
            OrderError::TransactionFailed(_) | OrderError::IdentifierGenerationFailed(_) => {
                tracing::error!(error = %err, "order creation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to create order".to_string(),
                )
            }
        },
        DomainError::Catalog(catalog_err) => match catalog_err {
            CatalogError::CategoryNotFound(_) | CatalogError::ProductNotFound(_) => {
                (StatusCode::NOT_FOUND, catalog_err.to_string())
            }
            CatalogError::DuplicateCategory(_) => (StatusCode::CONFLICT, catalog_err.to_string()),
            CatalogError::UpdateFailed(_) => (StatusCode::BAD_REQUEST, catalog_err.to_string()),
        },
        DomainError::Validation(errors) => (StatusCode::BAD_REQUEST, errors.to_string()),
        DomainError::Store(_) => {
            tracing::error!(error = %err, "store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_MESSAGE.to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        ApiError::Upload(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::RateLimited => ApiError::TooManyRequests(err.to_string()),
            _ => ApiError::Unauthorized(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected JSON body");
        let message = match rejection {
            JsonRejection::JsonDataError(_) => "request body has missing or mistyped fields",
            JsonRejection::MissingJsonContentType(_) => "content type must be application/json",
            JsonRejection::BytesRejection(_) => "request body could not be read",
            _ => "request body must be valid JSON",
        };
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => {
                ApiError::PayloadTooLarge("request body is too large".to_string())
            }
            _ => ApiError::BadRequest(message.to_string()),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected multipart body");
        ApiError::BadRequest("content type must be multipart/form-data".to_string())
    }
}
