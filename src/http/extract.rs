//! Request body extraction for create/update.
//!
//! Accepts either `multipart/form-data` (text fields plus an optional
//! `img` file) or a JSON object. An uploaded image is written to the
//! managed uploads directory before the handler runs.

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use serde_json::Value;

use super::error::ApiError;
use super::AppState;
use crate::entity::EntryFields;
use crate::uploads::UploadStore;

/// Multipart field carrying the image file.
pub const IMAGE_FIELD: &str = "img";

#[derive(Debug, Default)]
pub struct EntryRequest {
    pub fields: EntryFields,
    /// `uploads/...` path of the stored image, if one was sent
    pub upload: Option<String>,
}

impl FromRequest<AppState> for EntryRequest {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::Rejected(e.status(), e.body_text()))?;
            return read_multipart(multipart, state.service.uploads()).await;
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::Rejected(e.status(), e.body_text()))?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(EntryRequest::default());
        }

        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;
        if !value.is_object() {
            return Err(ApiError::bad_request("Invalid JSON body: expected an object"));
        }

        let fields: EntryFields = serde_json::from_value(value)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;

        Ok(EntryRequest {
            fields,
            upload: None,
        })
    }
}

async fn read_multipart(
    mut multipart: Multipart,
    uploads: &UploadStore,
) -> Result<EntryRequest, ApiError> {
    let mut request = EntryRequest::default();

    if let Err(e) = read_parts(&mut multipart, uploads, &mut request).await {
        if let Some(path) = request.upload.take() {
            uploads.delete_if_managed(&path).await;
        }
        return Err(e);
    }

    Ok(request)
}

async fn read_parts(
    multipart: &mut Multipart,
    uploads: &UploadStore,
    request: &mut EntryRequest,
) -> Result<(), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Rejected(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == IMAGE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Rejected(e.status(), e.body_text()))?;

            // browsers send an empty part for an untouched file input
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            if request.upload.is_some() {
                return Err(ApiError::bad_request(format!(
                    "Unexpected field: {}",
                    IMAGE_FIELD
                )));
            }
            request.upload = Some(uploads.store_upload(&file_name, &bytes).await?);
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::Rejected(e.status(), e.body_text()))?;
            request.fields.set_text(&name, value);
        }
    }

    Ok(())
}
