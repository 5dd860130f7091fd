//! Configuration types for clean-up and retouch operations

use crate::error::{Result, StudioError};
use serde::{Deserialize, Serialize};

/// Maximum accepted smoothing radius for the retouch stage
pub const MAX_SMOOTHING_RADIUS: u32 = 10;

/// Valid whitening factor range (inclusive)
pub const WHITENING_RANGE: (f32, f32) = (1.0, 2.0);

/// Default 3x3 neighborhood for blemish removal
pub const DEFAULT_MEDIAN_WINDOW: u32 = 3;

/// Maximum accepted upload size in bytes (10 MB)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Deadline for remote generation calls, in seconds
pub const REMOTE_TIMEOUT_SECS: u64 = 30;

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    Png,
    /// JPEG (no transparency; alpha is composited against black)
    Jpeg,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Png
    }
}

impl OutputFormat {
    /// File extension for this format (without the dot)
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// MIME type for the download interface
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Whether this format can carry an alpha channel
    #[must_use]
    pub fn supports_transparency(self) -> bool {
        match self {
            Self::Png => true,
            Self::Jpeg => false,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// User-tunable knobs for the retouch stage
///
/// Immutable once read for a given operation; not persisted across requests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Gaussian smoothing radius, 0-10 (0 = no blur)
    pub smoothing_radius: u32,

    /// Multiplicative brightness scaling, 1.0-2.0 (1.0 = no change)
    pub whitening_factor: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            smoothing_radius: 2,
            whitening_factor: 1.1,
        }
    }
}

impl FilterParams {
    /// Create new filter parameters, validating both ranges
    pub fn new(smoothing_radius: u32, whitening_factor: f32) -> Result<Self> {
        let params = Self {
            smoothing_radius,
            whitening_factor,
        };
        params.validate()?;
        Ok(params)
    }

    /// Validate that both knobs are within their documented domains
    ///
    /// Out-of-range parameters are rejected rather than clamped; only pixel
    /// sample values are ever clamped during processing.
    pub fn validate(&self) -> Result<()> {
        if self.smoothing_radius > MAX_SMOOTHING_RADIUS {
            return Err(StudioError::param_value_error(
                "smoothing radius",
                self.smoothing_radius,
                "0-10",
            ));
        }

        let (min, max) = WHITENING_RANGE;
        if !self.whitening_factor.is_finite()
            || self.whitening_factor < min
            || self.whitening_factor > max
        {
            return Err(StudioError::param_value_error(
                "whitening factor",
                self.whitening_factor,
                "1.0-2.0",
            ));
        }

        Ok(())
    }
}

/// Configuration for the processing pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Output format for the export adapter
    pub output_format: OutputFormat,

    /// JPEG quality (0-100, only used for JPEG output)
    pub jpeg_quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            jpeg_quality: 90,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder for fluent construction
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.jpeg_quality > 100 {
            return Err(StudioError::param_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "0-100",
            ));
        }
        Ok(())
    }
}

/// Builder for `PipelineConfig`
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set output format
    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Set JPEG quality
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    /// Build the configuration, validating at build time
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_params_defaults_valid() {
        assert!(FilterParams::default().validate().is_ok());
    }

    #[test]
    fn test_filter_params_boundaries() {
        assert!(FilterParams::new(0, 1.0).is_ok());
        assert!(FilterParams::new(10, 2.0).is_ok());
    }

    #[test]
    fn test_filter_params_rejects_out_of_range() {
        assert!(FilterParams::new(11, 1.5).is_err());
        assert!(FilterParams::new(2, 0.9).is_err());
        assert!(FilterParams::new(2, 2.1).is_err());
        assert!(FilterParams::new(2, f32::NAN).is_err());
    }

    #[test]
    fn test_output_format_properties() {
        assert_eq!(OutputFormat::Png.extension(), "png");
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Png.mime_type(), "image/png");
        assert_eq!(OutputFormat::Jpeg.mime_type(), "image/jpeg");
        assert!(OutputFormat::Png.supports_transparency());
        assert!(!OutputFormat::Jpeg.supports_transparency());
    }

    #[test]
    fn test_pipeline_config_builder() {
        let config = PipelineConfig::builder()
            .output_format(OutputFormat::Jpeg)
            .jpeg_quality(85)
            .build()
            .unwrap();
        assert_eq!(config.output_format, OutputFormat::Jpeg);
        assert_eq!(config.jpeg_quality, 85);
    }

    #[test]
    fn test_pipeline_config_rejects_bad_quality() {
        let result = PipelineConfig::builder().jpeg_quality(150).build();
        assert!(result.is_err());
    }
}
