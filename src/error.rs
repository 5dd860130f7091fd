//! Error types for clean-up and retouch operations

use thiserror::Error;

/// Result type alias for studio operations
pub type Result<T> = std::result::Result<T, StudioError>;

/// Error taxonomy for the clean-up/retouch pipeline and its collaborators
#[derive(Error, Debug)]
pub enum StudioError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input bytes that do not parse as a supported image format
    #[error("Decode error: {0}")]
    Decode(#[from] image::ImageError),

    /// Out-of-range filter arguments; rejected rather than silently clamped
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The external segmentation model cannot be invoked (missing weights,
    /// backend not compiled in, session initialization failure)
    #[error("Segmentation unavailable: {0}")]
    SegmentationUnavailable(String),

    /// A remote service call exceeded its deadline
    #[error("{service} request timed out after {seconds}s")]
    Timeout {
        /// Which collaborator timed out
        service: String,
        /// Deadline that was exceeded
        seconds: u64,
    },

    /// Format/alpha mismatch on export
    #[error("Unsupported conversion: {0}")]
    UnsupportedConversion(String),

    /// Network-level failures from remote collaborators
    #[error("Network error: {0}")]
    Network(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StudioError {
    /// Create a new invalid parameter error
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a new segmentation unavailable error
    pub fn segmentation_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::SegmentationUnavailable(msg.into())
    }

    /// Create a new unsupported conversion error
    pub fn unsupported_conversion<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedConversion(msg.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a timeout error for a named remote service
    pub fn timeout<S: Into<String>>(service: S, seconds: u64) -> Self {
        Self::Timeout {
            service: service.into(),
            seconds,
        }
    }

    /// Create a parameter error with the offending value and its valid range
    pub fn param_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidParameter(format!(
            "Invalid {parameter}: {value} (valid range: {valid_range})"
        ))
    }

    /// Create a decode error from a descriptive message
    pub fn decode_error<S: Into<String>>(msg: S) -> Self {
        Self::Decode(image::ImageError::IoError(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            msg.into(),
        )))
    }
}
