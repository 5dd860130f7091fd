#![allow(clippy::uninlined_format_args)]

//! # Retouch Studio
//!
//! A photo clean-up and retouch service: background removal via a
//! pretrained segmentation model, median-filter blemish removal, Gaussian
//! smoothing with brightness whitening, and a client for a remote
//! text-to-image generation endpoint. Results export as PNG (alpha
//! preserved) or JPEG (alpha composited against black).
//!
//! ## Quick Start
//!
//! ### Library usage
//!
//! ```rust,no_run
//! use retouch_studio::{CleanupAction, StudioProcessor, OutputFormat};
//!
//! # fn example(upload_bytes: Vec<u8>) -> retouch_studio::Result<()> {
//! let mut processor = StudioProcessor::default();
//! let result = processor.process_bytes(
//!     &upload_bytes,
//!     &CleanupAction::Retouch { smoothing_radius: 2, whitening_factor: 1.2 },
//! )?;
//! let png = result.to_bytes(OutputFormat::Png, 90)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Running the service
//!
//! The `cli` feature (on by default) provides the `retouch-studio` binary,
//! which serves the upload/download HTTP API:
//!
//! ```text
//! retouch-studio --bind 0.0.0.0:8080 --model isnet.onnx -vv
//! ```
//!
//! ## Feature Flags
//!
//! - `web` (default): HTTP service surface built on axum
//! - `cli` (default): command-line entrypoint for the service
//! - `onnx`: ONNX Runtime segmentation backend
//!
//! Without the `onnx` feature (or without a model path), background
//! removal requests fail with `SegmentationUnavailable`; every other
//! operation works normally.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod filters;
pub mod generate;
pub mod pipeline;
pub mod segmentation;
pub mod services;
#[cfg(feature = "web")]
pub mod web;

// Public API exports
pub use config::{FilterParams, OutputFormat, PipelineConfig, PipelineConfigBuilder};
pub use error::{Result, StudioError};
pub use filters::{median_denoise, retouch};
pub use generate::{GenerationRequest, ImageGenerator, RemoteGenerationClient};
pub use pipeline::{CleanupAction, ProcessedImage, ProcessingMetadata, StudioProcessor};
pub use segmentation::{remove_background, SegmentationBackend, SegmentationMask};
pub use services::{decode_image, encode_image};

/// Remove the background from encoded image bytes and re-encode as PNG
///
/// Convenience wrapper over [`StudioProcessor`] for callers that only need
/// the one operation. The output is always PNG so the new transparency
/// survives the round trip.
pub fn remove_background_from_bytes(
    image_bytes: &[u8],
    backend: Box<dyn SegmentationBackend>,
) -> Result<Vec<u8>> {
    let mut processor = StudioProcessor::new(backend);
    let result = processor.process_bytes(image_bytes, &CleanupAction::RemoveBackground)?;
    result.to_bytes(OutputFormat::Png, 90)
}

/// Apply the retouch stage to encoded image bytes
///
/// Decodes, smooths with the given radius, whitens by the given factor,
/// and re-encodes in the requested format.
pub fn retouch_bytes(
    image_bytes: &[u8],
    smoothing_radius: u32,
    whitening_factor: f32,
    format: OutputFormat,
) -> Result<Vec<u8>> {
    let mut processor = StudioProcessor::default();
    let result = processor.process_bytes(
        image_bytes,
        &CleanupAction::Retouch {
            smoothing_radius,
            whitening_factor,
        },
    )?;
    result.to_bytes(format, 90)
}
