// Lanczos resizing, used as the fallback path and to bring network output to the requested scale.

use super::target_dimensions;
use crate::error::EnhanceError;
use image::{RgbImage, imageops::FilterType};

pub fn upscale(input: &RgbImage, scale: u32) -> Result<RgbImage, EnhanceError> {
    let (width, height) = target_dimensions(input.width(), input.height(), scale)?;
    Ok(resize_to(input, width, height))
}

pub fn resize_to(input: &RgbImage, width: u32, height: u32) -> RgbImage {
    image::imageops::resize(input, width, height, FilterType::Lanczos3)
}
