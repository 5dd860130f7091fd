//! HTTP service surface
//!
//! Upload/download endpoints over the clean-up pipeline plus a proxy for
//! remote generation. Request bodies are capped before they reach any
//! handler, and every failure maps onto a JSON error envelope with a
//! stable code.

pub mod handlers;

use crate::{
    config::MAX_UPLOAD_BYTES,
    error::{Result, StudioError},
    generate::{ImageGenerator, RemoteGenerationClient},
    pipeline::StudioProcessor,
    segmentation::SegmentationBackend,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

/// Extra headroom on the body limit for multipart framing overhead
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Per-request deadline for the whole service, generous enough to cover
/// one remote generation call plus its single retry
const REQUEST_TIMEOUT_SECS: u64 = 90;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, e.g. "0.0.0.0:8080"
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Clean-up pipeline; the mutex serializes access to the segmentation
    /// session, which is not shareable across concurrent inferences
    pub processor: Arc<Mutex<StudioProcessor>>,

    /// Remote generation client (stateless, freely shared)
    pub generator: Arc<dyn ImageGenerator>,
}

impl AppState {
    /// Build state from a segmentation backend and generator
    #[must_use]
    pub fn new(backend: Box<dyn SegmentationBackend>, generator: Arc<dyn ImageGenerator>) -> Self {
        Self {
            processor: Arc::new(Mutex::new(StudioProcessor::new(backend))),
            generator,
        }
    }

    /// Build state with the default remote generation endpoint
    pub fn with_remote_generator(backend: Box<dyn SegmentationBackend>) -> Result<Self> {
        let generator = Arc::new(RemoteGenerationClient::new()?);
        Ok(Self::new(backend, generator))
    }
}

/// Run the HTTP service until shutdown
pub async fn serve(config: ServerConfig, state: AppState) -> Result<()> {
    let app = create_app(state);

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .map_err(|e| StudioError::internal(format!("invalid bind address {}: {e}", config.bind_addr)))?;

    tracing::info!("server starting on http://{addr}");
    tracing::info!("API endpoints:");
    tracing::info!("  POST /api/generate           - remote text-to-image generation");
    tracing::info!("  POST /api/cleanup/background - background removal");
    tracing::info!("  POST /api/cleanup/spots      - median denoise");
    tracing::info!("  POST /api/retouch            - smoothing and whitening");
    tracing::info!("  GET  /health                 - health check");
    tracing::info!("  GET  /api/info               - service information");

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| StudioError::internal(format!("failed to bind {addr}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| StudioError::internal(format!("server failed: {e}")))?;

    Ok(())
}

/// Assemble the router with its middleware stack
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(handlers::generate_handler))
        .route(
            "/api/cleanup/background",
            post(handlers::background_handler),
        )
        .route("/api/cleanup/spots", post(handlers::spots_handler))
        .route("/api/retouch", post(handlers::retouch_handler))
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Service information endpoint
async fn info_handler() -> Json<serde_json::Value> {
    Json(json!({
        "service": "Retouch Studio",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "limits": {
            "max_upload_bytes": MAX_UPLOAD_BYTES,
            "smoothing_radius": "0-10",
            "whitening_factor": "1.0-2.0",
        },
        "formats": ["png", "jpeg"],
    }))
}

impl StudioError {
    /// HTTP status for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedConversion(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::SegmentationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Network(_) => StatusCode::BAD_GATEWAY,
            Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the error envelope
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "DECODE_ERROR",
            Self::InvalidParameter(_) => "INVALID_PARAMETER",
            Self::UnsupportedConversion(_) => "UNSUPPORTED_CONVERSION",
            Self::SegmentationUnavailable(_) => "SEGMENTATION_UNAVAILABLE",
            Self::Timeout { .. } => "EXTERNAL_SERVICE_TIMEOUT",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for StudioError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        });

        tracing::error!("request failed: {self} ({status})");

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            StudioError::invalid_parameter("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StudioError::decode_error("bad bytes").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            StudioError::segmentation_unavailable("no model").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            StudioError::timeout("generation", 30).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            StudioError::unsupported_conversion("alpha").status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            StudioError::timeout("generation", 30).error_code(),
            "EXTERNAL_SERVICE_TIMEOUT"
        );
        assert_eq!(
            StudioError::invalid_parameter("x").error_code(),
            "INVALID_PARAMETER"
        );
    }
}
