// Downloads the pretrained weights into a scratch directory once and keeps
// the loaded engine around for the lifetime of the process.

use crate::enhancer::{EngineFactory, SharedEngine};
use crate::error::EnhanceError;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const FALLBACK_FILE_NAME: &str = "model.onnx";

pub struct ModelLoader {
    url: String,
    dir: PathBuf,
    client: reqwest::Client,
    // Held across check-and-download so concurrent first uses fetch the file once
    download_lock: tokio::sync::Mutex<()>,
}

impl ModelLoader {
    pub fn new(url: impl Into<String>, dir: impl Into<PathBuf>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            dir: dir.into(),
            client,
            download_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Default scratch directory, `$TMPDIR/realesrgan`.
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir().join("realesrgan")
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Where the weights live once downloaded: the last path segment of the URL inside the scratch directory.
    pub fn cached_path(&self) -> PathBuf {
        self.dir.join(file_name_from_url(&self.url))
    }

    /// Returns the local weights path, downloading the file only if it is not already cached.
    pub async fn ensure(&self) -> Result<PathBuf, EnhanceError> {
        let path = self.cached_path();
        if is_cached(&path).await {
            debug!("Using cached model weights at {}", path.display());
            return Ok(path);
        }

        let _download = self.download_lock.lock().await;
        if is_cached(&path).await {
            debug!("Model weights were downloaded by a concurrent caller");
            return Ok(path);
        }

        info!(
            "Downloading model weights from {} to {}",
            self.url,
            path.display()
        );

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| EnhanceError::io(&self.dir, e))?;

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| EnhanceError::network(&self.url, e))?;
        if !response.status().is_success() {
            return Err(EnhanceError::HttpStatus {
                url: self.url.clone(),
                status: response.status(),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| EnhanceError::network(&self.url, e))?;

        // Write next to the target and rename so a half-written file is never picked up as cached.
        let partial = path.with_file_name(format!("{}.part", file_name_from_url(&self.url)));
        tokio::fs::write(&partial, &bytes)
            .await
            .map_err(|e| EnhanceError::io(&partial, e))?;
        tokio::fs::rename(&partial, &path)
            .await
            .map_err(|e| EnhanceError::io(&path, e))?;

        info!(
            "Model weights saved to {} ({} bytes)",
            path.display(),
            bytes.len()
        );
        Ok(path)
    }
}

async fn is_cached(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

fn file_name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

/// The model as seen by request handlers: weights on scratch disk plus the engine loaded from them.
pub struct ModelHandle {
    loader: ModelLoader,
    factory: Arc<dyn EngineFactory>,
    engine: tokio::sync::Mutex<Option<SharedEngine>>,
}

impl ModelHandle {
    pub fn new(loader: ModelLoader, factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            loader,
            factory,
            engine: tokio::sync::Mutex::new(None),
        }
    }

    pub fn loader(&self) -> &ModelLoader {
        &self.loader
    }

    /// Makes sure the weights are on disk (re-downloading them if the scratch
    /// directory was cleared) and returns the engine, opening it on first use.
    pub async fn engine(&self) -> Result<SharedEngine, EnhanceError> {
        let weights = self.loader.ensure().await?;

        let mut slot = self.engine.lock().await;
        if let Some(engine) = slot.as_ref() {
            return Ok(engine.clone());
        }

        let factory = self.factory.clone();
        let engine = tokio::task::spawn_blocking(move || factory.open(&weights)).await??;
        let engine: SharedEngine = Arc::new(Mutex::new(engine));
        *slot = Some(engine.clone());
        Ok(engine)
    }
}
