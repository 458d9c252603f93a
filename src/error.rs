// src/error.rs
// Error type shared by the model loader, the enhancer and both request
// drivers. The HTTP layer maps it onto responses in web/error.rs.

use crate::enhancer::{MAX_SCALE, MIN_SCALE};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnhanceError {
    // Network failures (image fetch or model download)
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned HTTP {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    // Corrupt or unsupported input image
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    // Model failures (runtime or device)
    #[error("super-resolution model failed: {0}")]
    Model(String),
    #[error("no super-resolution model is available")]
    ModelUnavailable,

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("object storage error: {0}")]
    Storage(String),

    // Request validation
    #[error("invalid scale factor {0}, expected {min}..={max}", min = MIN_SCALE, max = MAX_SCALE)]
    InvalidScale(u32),
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Local batch driver
    #[error("input directory not found: {}", .0.display())]
    InputDirMissing(PathBuf),
    #[error("no supported image files found in {}", .0.display())]
    NoInputImages(PathBuf),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EnhanceError {
    pub fn network(url: &str, source: reqwest::Error) -> Self {
        EnhanceError::Network {
            url: url.to_string(),
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EnhanceError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ort::Error> for EnhanceError {
    fn from(err: ort::Error) -> Self {
        EnhanceError::Model(err.to_string())
    }
}

impl From<tokio::task::JoinError> for EnhanceError {
    fn from(err: tokio::task::JoinError) -> Self {
        EnhanceError::Internal(format!("blocking task failed: {}", err))
    }
}
