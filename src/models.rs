// Shared data types passed between the enhancer and the request drivers.

use image::RgbImage;
use std::fmt;

/// Which path produced an enhanced image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhanceMethod {
    // The Real-ESRGAN network (optionally followed by a Lanczos resize to the requested scale)
    Model,
    // Plain Lanczos interpolation
    Interpolation,
}

impl fmt::Display for EnhanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnhanceMethod::Model => f.write_str("Real-ESRGAN"),
            EnhanceMethod::Interpolation => f.write_str("Lanczos"),
        }
    }
}

/// Result of a successful enhancement. Only exists if one of the two paths succeeded.
#[derive(Debug, Clone)]
pub struct Enhanced {
    pub image: RgbImage,
    pub method: EnhanceMethod,
}

impl Enhanced {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
