//! HTTP handlers grouped by resource.

pub mod auth;
pub mod categories;
pub mod extract;
pub mod form;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;

use serde::{Deserialize, Serialize};
use store::PageRequest;

use crate::error::ApiError;

/// Raw `page` / `limit` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn to_request(&self) -> PageRequest {
        PageRequest::parse(self.page.as_deref(), self.limit.as_deref())
    }
}

/// Body carrying only a confirmation message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Parses a numeric path identifier.
pub(crate) fn parse_id(raw: &str, resource: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {resource} id")))
}
