// Local batch driver: enhances every supported image in a folder and writes
// `<name>_x<scale><ext>` into an output folder. Per-file failures are counted,
// never fatal.

use crate::enhancer::{Enhancer, SharedEngine};
use crate::error::EnhanceError;
use crate::io::codec;
use crate::models::EnhanceMethod;
use crate::pipeline::{Pipeline, enhance_blocking};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "webp"];

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub scale: u32,
    pub jpeg_quality: u8,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub processed: usize,
    pub outputs: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    // None if nothing was enhanced
    pub method: Option<EnhanceMethod>,
}

struct FileOutcome {
    output: PathBuf,
    method: EnhanceMethod,
    original: (u32, u32),
    enhanced: (u32, u32),
}

pub async fn run(options: &BatchOptions, pipeline: &Pipeline) -> Result<BatchSummary, EnhanceError> {
    if !options.input_dir.is_dir() {
        return Err(EnhanceError::InputDirMissing(options.input_dir.clone()));
    }

    tokio::fs::create_dir_all(&options.output_dir)
        .await
        .map_err(|e| EnhanceError::io(&options.output_dir, e))?;

    let files = find_images(&options.input_dir)?;
    if files.is_empty() {
        return Err(EnhanceError::NoInputImages(options.input_dir.clone()));
    }
    info!("Found {} image(s) to enhance.", files.len());

    // Resolved once so a failed download is not retried for every file.
    let engine = pipeline.engine().await?;
    if engine.is_none() {
        info!("Real-ESRGAN not available, using Lanczos interpolation.");
    }

    let mut summary = BatchSummary {
        total: files.len(),
        ..Default::default()
    };

    for input in files {
        info!("Processing: {}", input.display());

        let enhancer = pipeline.enhancer();
        let engine = engine.clone();
        let output_dir = options.output_dir.clone();
        let (scale, jpeg_quality) = (options.scale, options.jpeg_quality);
        let task_input = input.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            process_file(
                &task_input,
                &output_dir,
                scale,
                jpeg_quality,
                enhancer,
                engine.as_ref(),
            )
        })
        .await
        .map_err(EnhanceError::from)
        .and_then(|result| result);

        match outcome {
            Ok(outcome) => {
                info!(
                    "  Enhanced: {}x{} -> {}x{} ({})",
                    outcome.original.0,
                    outcome.original.1,
                    outcome.enhanced.0,
                    outcome.enhanced.1,
                    outcome.method
                );
                info!("  Saved to: {}", outcome.output.display());
                summary.processed += 1;
                summary.outputs.push(outcome.output);
                // Interpolation on any file downgrades the run's reported method
                summary.method = match summary.method {
                    Some(EnhanceMethod::Interpolation) => Some(EnhanceMethod::Interpolation),
                    _ => Some(outcome.method),
                };
            }
            Err(err) => {
                error!("  Failed to enhance {}: {}", input.display(), err);
                summary.failed.push(input);
            }
        }
    }

    info!(
        "Successfully enhanced {} out of {} images.",
        summary.processed, summary.total
    );
    if let Some(method) = summary.method {
        info!(
            "Enhanced images saved to '{}' with {}x scaling using {}.",
            options.output_dir.display(),
            options.scale,
            method
        );
    }

    Ok(summary)
}

/// Supported images directly inside `dir`, sorted by path.
pub fn find_images(dir: &Path) -> Result<Vec<PathBuf>, EnhanceError> {
    let entries = std::fs::read_dir(dir).map_err(|e| EnhanceError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| EnhanceError::io(dir, e))?.path();
        if path.is_file() && is_supported(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// `<name>_x<scale><ext>`, keeping the original extension.
pub fn output_file_name(input: &Path, scale: u32) -> Option<String> {
    let stem = input.file_stem()?.to_str()?;
    match input.extension().and_then(OsStr::to_str) {
        Some(ext) => Some(format!("{}_x{}.{}", stem, scale, ext)),
        None => Some(format!("{}_x{}", stem, scale)),
    }
}

fn process_file(
    input: &Path,
    output_dir: &Path,
    scale: u32,
    jpeg_quality: u8,
    enhancer: Enhancer,
    engine: Option<&SharedEngine>,
) -> Result<FileOutcome, EnhanceError> {
    let original = image::image_dimensions(input).map_err(EnhanceError::Decode)?;

    let data = std::fs::read(input).map_err(|e| EnhanceError::io(input, e))?;
    let image = codec::decode_rgb(&data, None)?;

    let enhanced = enhance_blocking(enhancer, engine, &image, scale)?;

    let file_name = output_file_name(input, scale).ok_or_else(|| {
        EnhanceError::InvalidRequest(format!("unusable file name {}", input.display()))
    })?;
    let output = output_dir.join(file_name);
    codec::save(&enhanced.image, &output, jpeg_quality)?;

    Ok(FileOutcome {
        output,
        method: enhanced.method,
        original,
        enhanced: enhanced.dimensions(),
    })
}
