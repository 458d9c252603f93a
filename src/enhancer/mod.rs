// Super-resolution with a Lanczos fallback.
//
// The network itself lives behind the `SuperResolution` trait; the
// `Enhancer` decides what happens when it is missing or fails.

pub mod interpolate;
pub mod realesrgan;

#[cfg(test)]
pub mod testing;

use crate::error::EnhanceError;
use crate::models::{EnhanceMethod, Enhanced};
use image::RgbImage;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const MIN_SCALE: u32 = 2;
pub const MAX_SCALE: u32 = 8;

/// A pretrained network mapping an RGB image to a larger estimate of it.
pub trait SuperResolution: Send {
    /// The fixed upscale factor baked into the network.
    fn native_scale(&self) -> u32;

    fn upscale(&mut self, input: &RgbImage) -> Result<RgbImage, EnhanceError>;
}

/// Opens a `SuperResolution` engine from a weights file on disk.
pub trait EngineFactory: Send + Sync {
    fn open(&self, weights: &Path) -> Result<Box<dyn SuperResolution>, EnhanceError>;
}

/// Loaded engines are shared by every request of the process; inference is serialised.
pub type SharedEngine = Arc<Mutex<Box<dyn SuperResolution>>>;

pub fn validate_scale(scale: u32) -> Result<u32, EnhanceError> {
    if (MIN_SCALE..=MAX_SCALE).contains(&scale) {
        Ok(scale)
    } else {
        Err(EnhanceError::InvalidScale(scale))
    }
}

/// `(width * scale, height * scale)`, rejecting results that overflow.
pub fn target_dimensions(width: u32, height: u32, scale: u32) -> Result<(u32, u32), EnhanceError> {
    match (width.checked_mul(scale), height.checked_mul(scale)) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(EnhanceError::InvalidRequest(format!(
            "{}x{} cannot be scaled by {}",
            width, height, scale
        ))),
    }
}

/// Runs the network and brings its output to exactly `scale` times the input.
///
/// The network always upscales by its native factor; any other scale is
/// reached by a Lanczos resize of the network output.
pub fn enhance_with_model(
    engine: &mut dyn SuperResolution,
    input: &RgbImage,
    scale: u32,
) -> Result<RgbImage, EnhanceError> {
    let (width, height) = input.dimensions();
    let (target_w, target_h) = target_dimensions(width, height, scale)?;

    let output = engine.upscale(input)?;
    if output.dimensions() == (target_w, target_h) {
        return Ok(output);
    }

    debug!(
        "Resizing network output {}x{} (native x{}) to {}x{}",
        output.width(),
        output.height(),
        engine.native_scale(),
        target_w,
        target_h
    );
    Ok(interpolate::resize_to(&output, target_w, target_h))
}

/// What to do when the model path is unavailable or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Resize with Lanczos interpolation instead.
    Interpolate,
    /// Fail the whole request.
    Fail,
}

#[derive(Debug, Clone, Copy)]
pub struct Enhancer {
    policy: FallbackPolicy,
}

impl Enhancer {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub fn enhance(
        &self,
        engine: Option<&mut dyn SuperResolution>,
        input: &RgbImage,
        scale: u32,
    ) -> Result<Enhanced, EnhanceError> {
        let model_result = match engine {
            Some(engine) => enhance_with_model(engine, input, scale),
            None => Err(EnhanceError::ModelUnavailable),
        };

        let err = match model_result {
            Ok(image) => {
                return Ok(Enhanced {
                    image,
                    method: EnhanceMethod::Model,
                });
            }
            Err(err) => err,
        };

        match self.policy {
            FallbackPolicy::Fail => Err(err),
            FallbackPolicy::Interpolate => {
                if matches!(err, EnhanceError::ModelUnavailable) {
                    debug!("Using Lanczos interpolation");
                } else {
                    warn!(
                        "Error enhancing image with Real-ESRGAN: {}. Falling back to Lanczos interpolation.",
                        err
                    );
                }
                let image = interpolate::upscale(input, scale)?;
                Ok(Enhanced {
                    image,
                    method: EnhanceMethod::Interpolation,
                })
            }
        }
    }
}
