// Entry point for upsclr-enhance.
// `serve` hosts the enhancement function over HTTP, `batch` enhances a local folder.

mod batch;
mod enhancer;
mod error;
mod io;
mod model_loader;
mod models;
mod pipeline;
mod shutdown_signal;
mod web;

use batch::BatchOptions;
use clap::{Args, Parser, Subcommand};
use enhancer::{Enhancer, FallbackPolicy, realesrgan::OnnxEngineFactory, validate_scale};
use error::EnhanceError;
use io::{codec, fetch::ImageFetcher, object_store::FsObjectStore};
use model_loader::{ModelHandle, ModelLoader};
use pipeline::Pipeline;
use shutdown_signal::shutdown_signal;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::Level;
use web::AppState;

/// Command line arguments for upsclr-enhance
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct AppConfig {
    /// Maximum log level.
    #[arg(long, global = true, env = "UPSCLR_ENHANCE_LOG_LEVEL", default_value_t = Level::INFO)]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the enhancement function over HTTP.
    Serve(ServeArgs),
    /// Enhance every supported image in a local folder.
    Batch(BatchArgs),
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// URL of the Real-ESRGAN x4 weights, exported to ONNX.
    /// Without it, no model is loaded.
    #[arg(long, env = "UPSCLR_ENHANCE_MODEL_URL")]
    model_url: Option<String>,

    /// Scratch directory the weights are cached in. Defaults to `$TMPDIR/realesrgan`.
    #[arg(long, env = "UPSCLR_ENHANCE_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Upscale factor, from 2 to 8.
    #[arg(short, long, env = "UPSCLR_ENHANCE_SCALE", default_value_t = 4)]
    scale: u32,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Hostname/IP to bind the server to.
    /// If this option is specified without value, it will default to "*", meaning the server will listen on all interfaces.
    #[arg(long, env = "UPSCLR_ENHANCE_HOST", default_value = "localhost", num_args = 0..=1, default_missing_value = "*")]
    host: String,

    /// Port number to listen on.
    #[arg(short, long, env = "UPSCLR_ENHANCE_PORT", default_value_t = 6795)]
    port: u16,

    /// Fall back to Lanczos interpolation when the model fails, instead of answering with a failure.
    #[arg(long, env = "UPSCLR_ENHANCE_HOSTED_FALLBACK", action = clap::ArgAction::SetTrue)]
    hosted_fallback: bool,

    /// Timeout in seconds for fetching source images.
    #[arg(long, env = "UPSCLR_ENHANCE_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    fetch_timeout_secs: u64,

    /// Root directory of the filesystem object store. Enables `POST /enhance/objects`.
    #[arg(long, env = "UPSCLR_ENHANCE_OBJECT_STORE_ROOT")]
    object_store_root: Option<PathBuf>,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Folder to read images from.
    #[arg(long, env = "UPSCLR_ENHANCE_INPUT_DIR", default_value = "images")]
    input_dir: PathBuf,

    /// Folder enhanced images are written to.
    #[arg(long, env = "UPSCLR_ENHANCE_OUTPUT_DIR", default_value = "enhanced")]
    output_dir: PathBuf,

    #[command(flatten)]
    model: ModelArgs,
}

impl ModelArgs {
    fn model_handle(&self) -> Option<Arc<ModelHandle>> {
        let Some(url) = &self.model_url else {
            tracing::warn!("No model URL configured; Real-ESRGAN is unavailable.");
            return None;
        };

        let dir = self.model_dir.clone().unwrap_or_else(ModelLoader::default_dir);
        tracing::info!("Model weights: {} (cached in {})", url, dir.display());

        let loader = ModelLoader::new(url.clone(), dir, reqwest::Client::new());
        Some(Arc::new(ModelHandle::new(loader, Arc::new(OnnxEngineFactory))))
    }
}

#[tokio::main]
async fn main() {
    // Parse command line args and environment variables
    let config = AppConfig::parse();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(true) // Include module path in logs
        .with_file(true) // Include source file name
        .with_line_number(true) // Include line numbers
        .init();

    let result = match config.command {
        Command::Serve(args) => serve(args).await,
        Command::Batch(args) => run_batch(args).await,
    };

    if let Err(e) = result {
        tracing::error!("FATAL: {}", e);
        eprintln!("FATAL: {}. Exiting.", e);
        std::process::exit(1);
    }
}

async fn serve(args: ServeArgs) -> Result<(), EnhanceError> {
    tracing::info!("Starting upsclr-enhance server...");

    let default_scale = validate_scale(args.model.scale)?;

    let policy = if args.hosted_fallback {
        FallbackPolicy::Interpolate
    } else {
        FallbackPolicy::Fail
    };
    tracing::info!("Model failure policy: {:?}", policy);

    let object_store = args.object_store_root.as_ref().map(|root| {
        tracing::info!("Object store rooted at {}", root.display());
        Arc::new(FsObjectStore::new(root)) as Arc<dyn io::object_store::ObjectStore>
    });

    let state = Arc::new(AppState {
        pipeline: Pipeline::new(args.model.model_handle(), Enhancer::new(policy)),
        fetcher: ImageFetcher::new(Duration::from_secs(args.fetch_timeout_secs))?,
        default_scale,
        object_store,
    });

    let app = web::create_app(state);
    tracing::info!("Axum router configured.");

    let (addr, listener) = web::create_listener(&args.host, args.port)
        .await
        .map_err(|e| EnhanceError::Internal(format!("Failed to bind server: {}", e)))?;
    tracing::info!("Server successfully bound. Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| EnhanceError::Internal(format!("Server shut down unexpectedly: {}", e)))?;

    tracing::info!("upsclr-enhance has shut down.");
    Ok(())
}

async fn run_batch(args: BatchArgs) -> Result<(), EnhanceError> {
    let options = BatchOptions {
        input_dir: args.input_dir,
        output_dir: args.output_dir,
        scale: validate_scale(args.model.scale)?,
        jpeg_quality: codec::BATCH_JPEG_QUALITY,
    };

    // The batch always completes, with interpolation if the model is unusable
    let pipeline = Pipeline::new(
        args.model.model_handle(),
        Enhancer::new(FallbackPolicy::Interpolate),
    );

    let summary = batch::run(&options, &pipeline).await?;
    if !summary.failed.is_empty() {
        tracing::warn!("{} image(s) could not be enhanced.", summary.failed.len());
    }
    Ok(())
}
