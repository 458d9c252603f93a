// Ties the model handle and the fallback policy together for both request drivers.

use crate::enhancer::{Enhancer, FallbackPolicy, SharedEngine};
use crate::error::EnhanceError;
use crate::io::codec;
use crate::model_loader::ModelHandle;
use crate::models::Enhanced;
use image::{ImageFormat, RgbImage};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct Pipeline {
    model: Option<Arc<ModelHandle>>,
    enhancer: Enhancer,
}

impl Pipeline {
    pub fn new(model: Option<Arc<ModelHandle>>, enhancer: Enhancer) -> Self {
        Self { model, enhancer }
    }

    pub fn enhancer(&self) -> Enhancer {
        self.enhancer
    }

    /// Resolves the engine for a request.
    ///
    /// With `FallbackPolicy::Fail` a missing or broken model is an error. With
    /// `FallbackPolicy::Interpolate` it is logged and `None` is returned so the
    /// caller interpolates instead.
    pub async fn engine(&self) -> Result<Option<SharedEngine>, EnhanceError> {
        let Some(model) = &self.model else {
            return match self.enhancer.policy() {
                FallbackPolicy::Fail => Err(EnhanceError::ModelUnavailable),
                FallbackPolicy::Interpolate => Ok(None),
            };
        };

        match model.engine().await {
            Ok(engine) => Ok(Some(engine)),
            Err(err) if self.enhancer.policy() == FallbackPolicy::Interpolate => {
                warn!(
                    "Error loading Real-ESRGAN model from {}: {}. Falling back to Lanczos interpolation.",
                    model.loader().url(),
                    err
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Decodes `data` to RGB off the async runtime.
    pub async fn decode(
        &self,
        data: Vec<u8>,
        format: Option<ImageFormat>,
    ) -> Result<RgbImage, EnhanceError> {
        tokio::task::spawn_blocking(move || codec::decode_rgb(&data, format)).await?
    }

    pub async fn enhance(
        &self,
        engine: Option<SharedEngine>,
        image: RgbImage,
        scale: u32,
    ) -> Result<Enhanced, EnhanceError> {
        let enhancer = self.enhancer;
        tokio::task::spawn_blocking(move || enhance_blocking(enhancer, engine.as_ref(), &image, scale))
            .await?
    }
}

/// Runs the enhancer on the current thread, holding the engine lock for the duration of the inference.
pub fn enhance_blocking(
    enhancer: Enhancer,
    engine: Option<&SharedEngine>,
    image: &RgbImage,
    scale: u32,
) -> Result<Enhanced, EnhanceError> {
    let Some(engine) = engine else {
        return enhancer.enhance(None, image, scale);
    };

    match engine.lock() {
        Ok(mut guard) => enhancer.enhance(Some(&mut **guard), image, scale),
        Err(_) => {
            warn!("Super-resolution engine is poisoned by an earlier panic");
            enhancer.enhance(None, image, scale)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhancer::testing::{FakeBehaviour, FakeFactory};
    use crate::model_loader::ModelLoader;
    use crate::models::EnhanceMethod;
    use image::Rgb;

    fn handle_with(dir: &std::path::Path, behaviour: FakeBehaviour) -> Arc<ModelHandle> {
        std::fs::write(dir.join("x4.onnx"), b"weights").unwrap();
        Arc::new(ModelHandle::new(
            ModelLoader::new("http://127.0.0.1:9/x4.onnx", dir, reqwest::Client::new()),
            Arc::new(FakeFactory::new(behaviour)),
        ))
    }

    #[tokio::test]
    async fn test_fail_policy_without_model_is_an_error() {
        let pipeline = Pipeline::new(None, Enhancer::new(FallbackPolicy::Fail));
        assert!(matches!(
            pipeline.engine().await,
            Err(EnhanceError::ModelUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_interpolate_policy_swallows_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Some(handle_with(dir.path(), FakeBehaviour::FailsToOpen)),
            Enhancer::new(FallbackPolicy::Interpolate),
        );

        let engine = pipeline.engine().await.unwrap();
        assert!(engine.is_none());

        let image = RgbImage::from_pixel(5, 5, Rgb([1, 1, 1]));
        let enhanced = pipeline.enhance(engine, image, 4).await.unwrap();
        assert_eq!(enhanced.method, EnhanceMethod::Interpolation);
        assert_eq!(enhanced.dimensions(), (20, 20));
    }

    #[tokio::test]
    async fn test_model_path_through_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Some(handle_with(dir.path(), FakeBehaviour::Works)),
            Enhancer::new(FallbackPolicy::Fail),
        );

        let engine = pipeline.engine().await.unwrap();
        let image = RgbImage::from_pixel(3, 2, Rgb([9, 9, 9]));
        let enhanced = pipeline.enhance(engine, image, 2).await.unwrap();
        assert_eq!(enhanced.method, EnhanceMethod::Model);
        assert_eq!(enhanced.dimensions(), (6, 4));
    }
}
