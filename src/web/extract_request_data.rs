use axum::{
    body,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use tracing::{debug, warn};

use super::{MAX_IMAGE_SIZE_BYTES, error::ApiError};

/// Image bytes as uploaded, before decoding.
#[derive(Debug)]
pub struct UploadedImage {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

/// Reads the image from either a multipart `file` field or the raw body.
pub async fn extract_request_image(request: Request) -> Result<UploadedImage, ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match content_type {
        Some(ct) if ct.starts_with("multipart/form-data") => extract_multipart_image(request).await,
        other => extract_direct_image(request, other).await,
    }
}

async fn extract_multipart_image(request: Request) -> Result<UploadedImage, ApiError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to process multipart request: {}", e)))?;

    let mut upload: Option<UploadedImage> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to process multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            debug!(
                "Ignoring multipart field: {}",
                field.name().unwrap_or("unnamed")
            );
            continue;
        }

        if upload.is_some() {
            warn!("Multiple 'file' fields found in multipart request, using the last one");
        }

        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file data: {}", e)))?;

        if data.is_empty() {
            return Err(ApiError::BadRequest(
                "Uploaded 'file' field is empty.".to_string(),
            ));
        }

        upload = Some(UploadedImage {
            data: data.to_vec(),
            content_type,
        });
    }

    upload.ok_or_else(|| ApiError::BadRequest("Missing 'file' field in multipart request.".to_string()))
}

async fn extract_direct_image(
    request: Request,
    content_type: Option<String>,
) -> Result<UploadedImage, ApiError> {
    if let Some(ct) = content_type.as_deref() {
        if !ct.starts_with("image/") && !ct.starts_with("application/octet-stream") {
            return Err(ApiError::UnsupportedMediaType(format!(
                "Content-Type '{}' is not supported. Expected image/*, multipart/form-data, or application/octet-stream.",
                ct
            )));
        }
    }

    let bytes = body::to_bytes(request.into_body(), MAX_IMAGE_SIZE_BYTES)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read request body: {}", e)))?;

    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Request body is empty.".to_string()));
    }

    Ok(UploadedImage {
        data: bytes.to_vec(),
        content_type,
    })
}
