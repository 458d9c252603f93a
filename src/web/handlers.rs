// API handlers for the hosted function

use super::{
    AppState, SharedState,
    error::ApiError,
    extract_request_data::extract_request_image,
    headers,
    image_codec::{OutputFormat, encode_output_image, format_hint},
    models::*,
};
use crate::enhancer::{SharedEngine, validate_scale};
use crate::error::EnhanceError;
use crate::io::{codec, object_store::ObjectStore};
use crate::models::Enhanced;
use axum::{
    Json,
    body::Bytes,
    extract::{Query, Request, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// --- GET /health ---
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// --- POST /enhance ---
// Enhances the image at `imageUrl`; failures answer 500 with the failure body
pub async fn enhance(
    State(state): State<SharedState>,
    payload: Result<Json<EnhanceRequest>, JsonRejection>,
) -> (StatusCode, Json<EnhanceResponse>) {
    let payload = payload
        .map(|Json(request)| request)
        .map_err(|rejection| EnhanceError::InvalidRequest(rejection.body_text()));
    let response = respond_to_enhance(&state, payload).await;
    let status = if response.status {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(response))
}

// --- POST /2015-03-31/functions/function/invocations ---
// Same pipeline, answered like a function result: always 200
// The event is the raw body; Content-Type is not required
pub async fn invoke(State(state): State<SharedState>, body: Bytes) -> Json<EnhanceResponse> {
    let payload = serde_json::from_slice::<EnhanceRequest>(&body)
        .map_err(|e| EnhanceError::InvalidRequest(format!("invalid event payload: {}", e)));
    Json(respond_to_enhance(&state, payload).await)
}

async fn respond_to_enhance(
    state: &AppState,
    payload: Result<EnhanceRequest, EnhanceError>,
) -> EnhanceResponse {
    let request_id = Uuid::new_v4();

    let result = match payload {
        Ok(request) => enhance_from_url(state, request, request_id).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(encoded) => EnhanceResponse::success(encoded),
        Err(err) => {
            // The caller only sees a generic failure; the stage is only in the logs
            error!("Error enhancing image (request_id={}): {}", request_id, err);
            EnhanceResponse::failure()
        }
    }
}

async fn enhance_from_url(
    state: &AppState,
    request: EnhanceRequest,
    request_id: Uuid,
) -> Result<String, EnhanceError> {
    let image_url = request
        .image_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| EnhanceError::InvalidRequest("missing imageUrl".to_string()))?;
    let scale = validate_scale(request.scale.unwrap_or(state.default_scale))?;

    info!(
        "Enhance request: image_url={}, scale={}, request_id={}",
        image_url, scale, request_id
    );

    let engine = state.pipeline.engine().await?;
    let data = state.fetcher.fetch(&image_url).await?;
    let image = state.pipeline.decode(data, None).await?;
    let original = image.dimensions();
    let enhanced = state.pipeline.enhance(engine, image, scale).await?;

    debug!(
        "Enhanced {}x{} -> {}x{} using {} (request_id={})",
        original.0,
        original.1,
        enhanced.image.width(),
        enhanced.image.height(),
        enhanced.method,
        request_id
    );

    let encoded = tokio::task::spawn_blocking(move || {
        codec::encode_jpeg(&enhanced.image, codec::DEFAULT_JPEG_QUALITY)
            .map(|jpeg| codec::to_base64(&jpeg))
    })
    .await??;
    Ok(encoded)
}

// --- POST /enhance/objects ---
// Downloads each object, enhances it and uploads `<prefix><stem>_x<scale>.jpg`
pub async fn enhance_objects(
    State(state): State<SharedState>,
    payload: Result<Json<EnhanceObjectsRequest>, JsonRejection>,
) -> Response {
    let Some(store) = state.object_store.clone() else {
        return error_body(
            StatusCode::NOT_IMPLEMENTED,
            "Object storage is not configured.".to_string(),
        );
    };

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error_body(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let Some(output_bucket) = request.output.bucket.clone().filter(|b| !b.is_empty()) else {
        return error_body(
            StatusCode::BAD_REQUEST,
            "Output bucket not specified.".to_string(),
        );
    };

    let scale = match validate_scale(request.scale.unwrap_or(state.default_scale)) {
        Ok(scale) => scale,
        Err(err) => return error_body(StatusCode::BAD_REQUEST, err.to_string()),
    };

    let job = ObjectJob {
        state: state.as_ref(),
        store,
        output_bucket,
        prefix: request.output.prefix.clone(),
        scale,
    };

    match job.run(&request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => {
            error!("Error processing object batch: {}", err);
            error_body(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn error_body(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// `<prefix><file stem of key>_x<scale>.jpg`
fn output_key_for(prefix: &str, input_key: &str, scale: u32) -> String {
    let stem = Path::new(input_key)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(input_key);
    format!("{}{}_x{}.jpg", prefix, stem, scale)
}

struct ObjectJob<'a> {
    state: &'a AppState,
    store: Arc<dyn ObjectStore>,
    output_bucket: String,
    prefix: String,
    scale: u32,
}

impl ObjectJob<'_> {
    async fn run(&self, request: &EnhanceObjectsRequest) -> Result<EnhanceObjectsResponse, EnhanceError> {
        let mut response = EnhanceObjectsResponse::default();

        // Only per-item enhancement failures are skipped; an unusable model fails the batch
        let engine = self.state.pipeline.engine().await?;

        for object in &request.images {
            let Some((bucket, key)) = object.location() else {
                debug!("Skipping image entry without bucket or key");
                continue;
            };
            if let Some(result) = self.process(engine.clone(), bucket, key).await? {
                response.results.push(result);
            }
        }

        if let Some((bucket, key)) = request.profile_pic.as_ref().and_then(ObjectRef::location) {
            response.profile_pic_result = self.process(engine, bucket, key).await?;
        }

        Ok(response)
    }

    /// `Ok(None)` when the object could not be enhanced; storage failures are errors.
    async fn process(
        &self,
        engine: Option<SharedEngine>,
        bucket: &str,
        key: &str,
    ) -> Result<Option<ObjectResult>, EnhanceError> {
        let data = {
            let store = self.store.clone();
            let (bucket, key) = (bucket.to_string(), key.to_string());
            tokio::task::spawn_blocking(move || store.get(&bucket, &key)).await??
        };

        let enhanced = match self.enhance(engine, data).await {
            Ok(enhanced) => enhanced,
            Err(err) => {
                warn!("Failed to enhance s3://{}/{}: {}", bucket, key, err);
                return Ok(None);
            }
        };

        let (width, height) = enhanced.dimensions();
        let output_key = output_key_for(&self.prefix, key, self.scale);

        let store = self.store.clone();
        let (output_bucket, upload_key) = (self.output_bucket.clone(), output_key.clone());
        tokio::task::spawn_blocking(move || {
            let jpeg = codec::encode_jpeg(&enhanced.image, codec::DEFAULT_JPEG_QUALITY)?;
            store.put(&output_bucket, &upload_key, &jpeg, "image/jpeg")
        })
        .await??;

        info!(
            "Uploaded s3://{}/{} ({}x{})",
            self.output_bucket, output_key, width, height
        );

        Ok(Some(ObjectResult {
            input_key: key.to_string(),
            output_key,
            width,
            height,
            mime: "image/jpeg".to_string(),
        }))
    }

    async fn enhance(&self, engine: Option<SharedEngine>, data: Vec<u8>) -> Result<Enhanced, EnhanceError> {
        let image = self.state.pipeline.decode(data, None).await?;
        self.state.pipeline.enhance(engine, image, self.scale).await
    }
}

// --- POST /upscale?scale=N ---
// Upscales an uploaded image and answers with the negotiated format
pub async fn upscale_image(
    State(state): State<SharedState>,
    Query(params): Query<ScaleQueryParam>,
    accept_header: Option<TypedHeader<headers::Accept>>,
    request: Request,
) -> Result<Response, ApiError> {
    let scale = validate_scale(params.scale.unwrap_or(state.default_scale))?;

    let output_format = match accept_header {
        Some(TypedHeader(accept)) => accept
            .negotiate(|mime| OutputFormat::try_from(mime).ok())
            .ok_or_else(|| ApiError::NotAcceptable("No acceptable output format found".to_string()))?,
        None => OutputFormat::Jpeg {
            quality: codec::DEFAULT_JPEG_QUALITY,
        },
    };

    let request_id = Uuid::new_v4();
    info!(
        "Upscale request: scale={}, output={:?}, request_id={}",
        scale, output_format, request_id
    );

    let upload = extract_request_image(request).await?;
    let hint = format_hint(upload.content_type.as_deref())?;

    let engine = state.pipeline.engine().await?;
    let image = state.pipeline.decode(upload.data, hint).await?;
    let enhanced = state.pipeline.enhance(engine, image, scale).await?;

    debug!(
        "Upscale completed: {}x{} using {} (request_id={})",
        enhanced.image.width(),
        enhanced.image.height(),
        enhanced.method,
        request_id
    );

    tokio::task::spawn_blocking(move || encode_output_image(&enhanced.image, output_format))
        .await
        .map_err(|e| ApiError::InternalServerError(format!("Image encode task failed: {}", e)))?
}
