//! Reading `multipart/form-data` bodies.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::StatusCode;
use domain::ValidationErrors;

use crate::error::ApiError;
use crate::upload::UploadedFile;

/// Text fields and files of one multipart request.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormData {
    /// Buffers every part of the request. Later parts win over earlier ones.
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    // Browsers send an empty part for an unselected file input.
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let text = field.text().await.map_err(multipart_error)?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// Returns a text field, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// Parses a numeric field. Absent or blank fields are `None`.
    pub fn optional_number<T: FromStr>(&self, name: &str) -> Result<Option<T>, ApiError> {
        match self.fields.get(name).map(|v| v.trim()) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ValidationErrors::single(name, "must be a number").into()),
        }
    }

    /// Parses a numeric field, defaulting to zero so that required checks report it.
    pub fn number<T: FromStr + Default>(&self, name: &str) -> Result<T, ApiError> {
        Ok(self.optional_number(name)?.unwrap_or_default())
    }

    /// Removes and returns an uploaded file.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

impl<S: Send + Sync> FromRequest<S> for FormData {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        Self::read(multipart).await
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    tracing::debug!(error = %err.body_text(), "unreadable multipart body");
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("request body is too large".to_string())
    } else {
        ApiError::BadRequest("request body is not valid multipart/form-data".to_string())
    }
}
