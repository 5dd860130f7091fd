//! Clean-up pipeline orchestration
//!
//! [`StudioProcessor`] ties the stages together: decode the uploaded bytes,
//! apply exactly one clean-up operation, and hand back a [`ProcessedImage`]
//! that can be encoded for download. Each request is independent; the
//! processor holds no per-image state beyond the segmentation backend's
//! session.

use crate::{
    config::{OutputFormat, DEFAULT_MEDIAN_WINDOW, MAX_UPLOAD_BYTES},
    error::{Result, StudioError},
    filters::{median_denoise, retouch},
    segmentation::{remove_background, SegmentationBackend, UnavailableBackend},
    services::{decode_image, encode_image},
};
use image::DynamicImage;
use log::{debug, info};
use std::time::Instant;

/// One clean-up operation applied to an uploaded image
#[derive(Debug, Clone, PartialEq)]
pub enum CleanupAction {
    /// Replace background pixels with transparency
    RemoveBackground,

    /// Suppress impulse noise with a square median filter
    MedianDenoise {
        /// Window side length, must be a positive odd integer
        window: u32,
    },

    /// Smooth then whiten the whole frame
    Retouch {
        /// Gaussian blur radius, 0 disables smoothing
        smoothing_radius: u32,
        /// Brightness multiplier in [1.0, 2.0]
        whitening_factor: f32,
    },
}

impl CleanupAction {
    /// Short operation name for logs and response metadata
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RemoveBackground => "remove_background",
            Self::MedianDenoise { .. } => "median_denoise",
            Self::Retouch { .. } => "retouch",
        }
    }
}

impl Default for CleanupAction {
    fn default() -> Self {
        Self::MedianDenoise {
            window: DEFAULT_MEDIAN_WINDOW,
        }
    }
}

/// Per-stage wall-clock timings in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingTimings {
    /// Time spent decoding the uploaded bytes
    pub decode_ms: u64,

    /// Time spent in the clean-up stage itself
    pub transform_ms: u64,
}

impl ProcessingTimings {
    /// Total processing time
    #[must_use]
    pub fn total_ms(&self) -> u64 {
        self.decode_ms + self.transform_ms
    }
}

/// Metadata recorded for one processed request
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingMetadata {
    /// Which operation produced this image
    pub operation: String,

    /// Input dimensions (width, height)
    pub dimensions: (u32, u32),

    /// Whether the output carries an alpha channel
    pub has_alpha: bool,

    /// Stage timings
    pub timings: ProcessingTimings,

    /// When processing finished
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Result of one clean-up operation
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// The transformed image
    pub image: DynamicImage,

    /// Request metadata
    pub metadata: ProcessingMetadata,
}

impl ProcessedImage {
    /// Encode the image for download
    pub fn to_bytes(&self, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        encode_image(&self.image, format, quality)
    }

    /// Encode and write the image to a file
    pub fn save<P: AsRef<std::path::Path>>(
        &self,
        path: P,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()> {
        let bytes = self.to_bytes(format, quality)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Stateful processor owning the segmentation backend
pub struct StudioProcessor {
    backend: Box<dyn SegmentationBackend>,
}

impl StudioProcessor {
    /// Create a processor with the given segmentation backend
    #[must_use]
    pub fn new(backend: Box<dyn SegmentationBackend>) -> Self {
        Self { backend }
    }

    /// Decode, apply one clean-up action, and return the result with
    /// timings
    ///
    /// Uploads larger than the configured limit are rejected before any
    /// decoding work happens.
    pub fn process_bytes(&mut self, bytes: &[u8], action: &CleanupAction) -> Result<ProcessedImage> {
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(StudioError::invalid_parameter(format!(
                "upload of {} bytes exceeds the {} byte limit",
                bytes.len(),
                MAX_UPLOAD_BYTES
            )));
        }

        let decode_start = Instant::now();
        let image = decode_image(bytes)?;
        let decode_ms = decode_start.elapsed().as_millis() as u64;

        let dimensions = (image.width(), image.height());
        debug!(
            "processing {}x{} image with {}",
            dimensions.0,
            dimensions.1,
            action.name()
        );

        let transform_start = Instant::now();
        let output = self.apply(&image, action)?;
        let transform_ms = transform_start.elapsed().as_millis() as u64;

        let metadata = ProcessingMetadata {
            operation: action.name().to_string(),
            dimensions,
            has_alpha: output.color().has_alpha(),
            timings: ProcessingTimings {
                decode_ms,
                transform_ms,
            },
            timestamp: chrono::Utc::now(),
        };

        info!(
            "{} finished in {}ms ({}x{})",
            metadata.operation,
            metadata.timings.total_ms(),
            dimensions.0,
            dimensions.1
        );

        Ok(ProcessedImage {
            image: output,
            metadata,
        })
    }

    fn apply(&mut self, image: &DynamicImage, action: &CleanupAction) -> Result<DynamicImage> {
        match action {
            CleanupAction::RemoveBackground => remove_background(image, self.backend.as_mut()),
            CleanupAction::MedianDenoise { window } => median_denoise(image, *window),
            CleanupAction::Retouch {
                smoothing_radius,
                whitening_factor,
            } => retouch(image, *smoothing_radius, *whitening_factor),
        }
    }
}

impl Default for StudioProcessor {
    fn default() -> Self {
        Self::new(Box::new(UnavailableBackend::default()))
    }
}
