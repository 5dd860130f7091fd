//! Service entrypoint
//!
//! Parses command-line flags, wires up the segmentation backend and the
//! remote generation client, and runs the HTTP service.

use crate::{
    error::{Result, StudioError},
    generate::{ImageGenerator, RemoteGenerationClient, DEFAULT_ENDPOINT},
    segmentation::{SegmentationBackend, UnavailableBackend},
    web::{self, AppState, ServerConfig},
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Photo clean-up and retouch service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "retouch-studio")]
pub struct Cli {
    /// Address to bind the HTTP service to
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Path to an ONNX segmentation model (requires the "onnx" feature)
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Remote generation endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Enable verbose logging (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;

    let backend = build_backend(cli.model.as_deref())?;
    let generator: Arc<dyn ImageGenerator> =
        Arc::new(RemoteGenerationClient::with_endpoint(&cli.endpoint)?);

    let state = AppState::new(backend, generator);
    let config = ServerConfig {
        bind_addr: cli.bind,
    };

    web::serve(config, state).await
}

fn init_tracing(verbose_count: u8) -> Result<()> {
    let default_level = match verbose_count {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| StudioError::internal(format!("failed to initialize tracing: {e}")))?;

    Ok(())
}

#[cfg(feature = "onnx")]
fn build_backend(model: Option<&std::path::Path>) -> Result<Box<dyn SegmentationBackend>> {
    use crate::segmentation::onnx::OnnxSegmenter;

    match model {
        Some(path) => Ok(Box::new(OnnxSegmenter::new(path))),
        None => Ok(Box::new(UnavailableBackend::new(
            "no segmentation model configured (pass --model <PATH>)",
        ))),
    }
}

#[cfg(not(feature = "onnx"))]
fn build_backend(model: Option<&std::path::Path>) -> Result<Box<dyn SegmentationBackend>> {
    if model.is_some() {
        return Err(StudioError::segmentation_unavailable(
            "--model requires a build with the `onnx` feature",
        ));
    }
    Ok(Box::new(UnavailableBackend::default()))
}
