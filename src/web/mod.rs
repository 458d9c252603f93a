// Hosted HTTP function: enhance-by-URL, object-storage batches and raw uploads.

mod app;
mod error;
mod extract_request_data;
mod handlers;
mod headers;
mod image_codec;
mod listeners;
mod models;

pub use app::{create_app, create_router};
pub use listeners::create_listener;

use crate::io::fetch::ImageFetcher;
use crate::io::object_store::ObjectStore;
use crate::pipeline::Pipeline;
use std::sync::Arc;

// Maximum allowed size for image upload requests
pub const MAX_IMAGE_SIZE_BYTES: usize = 100 * 1024 * 1024; // 100MB

pub struct AppState {
    pub pipeline: Pipeline,
    pub fetcher: ImageFetcher,
    pub default_scale: u32,
    // None keeps the object-storage route disabled
    pub object_store: Option<Arc<dyn ObjectStore>>,
}

pub type SharedState = Arc<AppState>;
