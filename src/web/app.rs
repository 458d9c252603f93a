use super::{MAX_IMAGE_SIZE_BYTES, SharedState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{IntoMakeService, get, post},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::Level;

// Path the local Lambda runtime emulator exposes for function invocations
pub const LAMBDA_INVOCATION_PATH: &str = "/2015-03-31/functions/function/invocations";

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Enhance a single image by URL
        .route("/enhance", post(handlers::enhance))
        .route(LAMBDA_INVOCATION_PATH, post(handlers::invoke))
        // Enhance objects from storage and upload the results
        .route("/enhance/objects", post(handlers::enhance_objects))
        // Raw image upload, output format negotiated from Accept
        .route("/upscale", post(handlers::upscale_image))
        // Apply a layer to limit the maximum size of request bodies
        .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE_BYTES))
        // Add CORS layer for broader client compatibility
        .layer(CorsLayer::permissive())
        // Add tracing for HTTP requests and responses
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::INFO)))
        .with_state(state)
}

pub fn create_app(state: SharedState) -> IntoMakeService<Router> {
    create_router(state).into_make_service()
}
