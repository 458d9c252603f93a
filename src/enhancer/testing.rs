// Stand-in engines for tests that must not depend on ONNX Runtime or real weights.

use super::{EngineFactory, SuperResolution};
use crate::error::EnhanceError;
use image::{RgbImage, imageops::FilterType};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Nearest-neighbour 4x "network".
#[derive(Default)]
pub struct NearestSr {
    pub calls: usize,
}

impl SuperResolution for NearestSr {
    fn native_scale(&self) -> u32 {
        4
    }

    fn upscale(&mut self, input: &RgbImage) -> Result<RgbImage, EnhanceError> {
        self.calls += 1;
        Ok(image::imageops::resize(
            input,
            input.width() * 4,
            input.height() * 4,
            FilterType::Nearest,
        ))
    }
}

/// Always fails, like a runtime without a usable device.
pub struct BrokenSr;

impl SuperResolution for BrokenSr {
    fn native_scale(&self) -> u32 {
        4
    }

    fn upscale(&mut self, _input: &RgbImage) -> Result<RgbImage, EnhanceError> {
        Err(EnhanceError::Model("device lost".to_string()))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum FakeBehaviour {
    Works,
    FailsToOpen,
    FailsToRun,
}

/// Factory handing out fake engines and counting how often it was asked to open weights.
#[derive(Clone)]
pub struct FakeFactory {
    behaviour: FakeBehaviour,
    pub opened: Arc<AtomicUsize>,
}

impl FakeFactory {
    pub fn new(behaviour: FakeBehaviour) -> Self {
        Self {
            behaviour,
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl EngineFactory for FakeFactory {
    fn open(&self, weights: &Path) -> Result<Box<dyn SuperResolution>, EnhanceError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if !weights.is_file() {
            return Err(EnhanceError::Model(format!(
                "weights missing at {}",
                weights.display()
            )));
        }
        match self.behaviour {
            FakeBehaviour::Works => Ok(Box::new(NearestSr::default())),
            FakeBehaviour::FailsToRun => Ok(Box::new(BrokenSr)),
            FakeBehaviour::FailsToOpen => Err(EnhanceError::Model(
                "unsupported model format".to_string(),
            )),
        }
    }
}
