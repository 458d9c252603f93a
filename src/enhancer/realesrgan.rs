use super::{EngineFactory, SuperResolution};
use crate::error::EnhanceError;
use image::{Rgb, RgbImage};
use ndarray::{Array4, ArrayView4, Ix4};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::Tensor,
};
use std::path::Path;
use tracing::{debug, info};

/// realesr-general-x4v3 (SRVGGNetCompact: 3 in/out channels, 64 features, 32 conv layers) upscales by 4.
pub const NATIVE_SCALE: u32 = 4;

/// Real-ESRGAN running on ONNX Runtime. The whole image goes through the network
/// in one pass; there is no tiling, so memory grows with the input size.
pub struct RealEsrgan {
    session: Session,
}

impl RealEsrgan {
    pub fn from_path(path: &Path) -> Result<Self, EnhanceError> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(path)?;

        info!("Loaded Real-ESRGAN model from {}", path.display());
        Ok(Self { session })
    }
}

impl SuperResolution for RealEsrgan {
    fn native_scale(&self) -> u32 {
        NATIVE_SCALE
    }

    fn upscale(&mut self, input: &RgbImage) -> Result<RgbImage, EnhanceError> {
        let input_tensor = Tensor::from_array(image_to_tensor(input))?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let output = outputs[0].try_extract_array::<f32>()?;
        let output = output
            .into_dimensionality::<Ix4>()
            .map_err(|e| EnhanceError::Model(format!("unexpected output rank: {}", e)))?;

        debug!(
            "Network output shape {:?} for {}x{} input",
            output.shape(),
            input.width(),
            input.height()
        );
        tensor_to_image(output)
    }
}

/// Opens `RealEsrgan` sessions from downloaded weights.
pub struct OnnxEngineFactory;

impl EngineFactory for OnnxEngineFactory {
    fn open(&self, weights: &Path) -> Result<Box<dyn SuperResolution>, EnhanceError> {
        Ok(Box::new(RealEsrgan::from_path(weights)?))
    }
}

// NCHW, RGB, f32 in [0, 1]
fn image_to_tensor(input: &RgbImage) -> Array4<f32> {
    let (width, height) = input.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
    for (x, y, pixel) in input.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }
    tensor
}

fn tensor_to_image(tensor: ArrayView4<'_, f32>) -> Result<RgbImage, EnhanceError> {
    let shape = tensor.shape();
    if shape[0] != 1 || shape[1] != 3 {
        return Err(EnhanceError::Model(format!(
            "expected a 1x3xHxW output, got {:?}",
            shape
        )));
    }
    let (height, width) = (shape[2] as u32, shape[3] as u32);

    Ok(RgbImage::from_fn(width, height, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb([0, 1, 2].map(|c| (tensor[[0, c, y, x]].clamp(0.0, 1.0) * 255.0).round() as u8))
    }))
}
