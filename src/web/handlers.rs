//! Request handlers for the clean-up and generation endpoints
//!
//! Clean-up endpoints accept multipart uploads (an `image` part plus
//! text parts for knobs) and reply with encoded image bytes ready for
//! download. Parameter parsing is strict: a malformed knob is rejected,
//! never silently defaulted.

use super::AppState;
use crate::{
    config::{OutputFormat, DEFAULT_MEDIAN_WINDOW},
    error::{Result, StudioError},
    generate::GenerationRequest,
    pipeline::CleanupAction,
};
use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Instant;

/// Largest accepted generation dimension
const MAX_GENERATION_DIMENSION: u32 = 2048;

/// JSON body for the generation endpoint
#[derive(Debug, Deserialize)]
pub struct GenerateApiRequest {
    /// Text prompt (required, non-empty)
    pub prompt: String,

    /// Output width in pixels
    #[serde(default)]
    pub width: Option<u32>,

    /// Output height in pixels
    #[serde(default)]
    pub height: Option<u32>,

    /// Fixed seed; omitted means a random one
    #[serde(default)]
    pub seed: Option<u32>,

    /// Request an animated clip instead of a still image
    #[serde(default)]
    pub video: bool,
}

/// Proxy a generation request to the remote service and stream the result
/// back as a download
pub async fn generate_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerateApiRequest>,
) -> Result<Response> {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();

    if request.prompt.trim().is_empty() {
        return Err(StudioError::invalid_parameter("prompt must not be empty"));
    }

    let mut generation = GenerationRequest::new(request.prompt.trim());
    if let Some(width) = request.width {
        validate_dimension("width", width)?;
        generation.width = width;
    }
    if let Some(height) = request.height {
        validate_dimension("height", height)?;
        generation.height = height;
    }
    if let Some(seed) = request.seed {
        generation.seed = seed;
    }
    if request.video {
        generation.video = true;
    }

    tracing::info!(
        "generation request: request_id={request_id}, {}x{}, video={}",
        generation.width,
        generation.height,
        generation.video
    );

    let bytes = state.generator.generate(&generation).await?;

    tracing::info!(
        "generation completed: request_id={request_id}, {} bytes, time={:.3}s",
        bytes.len(),
        start.elapsed().as_secs_f32()
    );

    // The endpoint serves animated output as a GIF
    let (mime, extension) = if generation.video {
        ("image/gif", "gif")
    } else {
        ("image/png", "png")
    };
    let filename = format!("gen_{}.{extension}", generation.seed);
    Ok(download_response(bytes, mime, &filename, &request_id))
}

/// Remove the background from an uploaded image
pub async fn background_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response> {
    let upload = Upload::from_multipart(multipart).await?;
    run_cleanup(&state, upload, CleanupAction::RemoveBackground).await
}

/// Median-filter an uploaded image to suppress blemishes and impulse noise
pub async fn spots_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response> {
    let upload = Upload::from_multipart(multipart).await?;
    let window = upload
        .parse_knob("window")?
        .unwrap_or(DEFAULT_MEDIAN_WINDOW);
    run_cleanup(&state, upload, CleanupAction::MedianDenoise { window }).await
}

/// Smooth and whiten an uploaded image
pub async fn retouch_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response> {
    let upload = Upload::from_multipart(multipart).await?;
    let smoothing_radius = upload.parse_knob("smoothing_radius")?.unwrap_or(2u32);
    let whitening_factor = upload.parse_knob("whitening_factor")?.unwrap_or(1.1f32);
    run_cleanup(
        &state,
        upload,
        CleanupAction::Retouch {
            smoothing_radius,
            whitening_factor,
        },
    )
    .await
}

/// Run one clean-up action and encode the result for download
async fn run_cleanup(state: &AppState, upload: Upload, action: CleanupAction) -> Result<Response> {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();

    tracing::info!(
        "cleanup request: request_id={request_id}, operation={}, {} bytes, format={}",
        action.name(),
        upload.image.len(),
        upload.format
    );

    let processed = {
        let mut processor = state.processor.lock().await;
        processor.process_bytes(&upload.image, &action)?
    };
    let bytes = processed.to_bytes(upload.format, upload.quality)?;

    tracing::info!(
        "cleanup completed: request_id={request_id}, operation={}, time={:.3}s",
        action.name(),
        start.elapsed().as_secs_f32()
    );

    let filename = format!("{}.{}", action.name(), upload.format.extension());
    Ok(download_response(
        bytes,
        upload.format.mime_type(),
        &filename,
        &request_id,
    ))
}

/// Parsed multipart upload: the image bytes, export knobs, and any
/// operation-specific text fields
struct Upload {
    image: Vec<u8>,
    format: OutputFormat,
    quality: u8,
    knobs: HashMap<String, String>,
}

impl Upload {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut image: Option<Vec<u8>> = None;
        let mut format = OutputFormat::default();
        let mut quality = 90u8;
        let mut knobs = HashMap::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| StudioError::invalid_parameter(format!("malformed multipart body: {e}")))?
        {
            let name = field.name().unwrap_or("unknown").to_string();
            match name.as_str() {
                "image" => {
                    let data = field.bytes().await.map_err(|e| {
                        StudioError::invalid_parameter(format!("failed to read image part: {e}"))
                    })?;
                    if data.is_empty() {
                        return Err(StudioError::invalid_parameter("image part is empty"));
                    }
                    image = Some(data.to_vec());
                },
                "format" => {
                    let value = read_text(field).await?;
                    format = parse_format(&value)?;
                },
                "quality" => {
                    let value = read_text(field).await?;
                    quality = parse_value("quality", &value)?;
                    if quality > 100 {
                        return Err(StudioError::param_value_error("quality", quality, "0-100"));
                    }
                },
                _ => {
                    let value = read_text(field).await?;
                    knobs.insert(name, value);
                },
            }
        }

        let image =
            image.ok_or_else(|| StudioError::invalid_parameter("no image part provided"))?;

        Ok(Self {
            image,
            format,
            quality,
            knobs,
        })
    }

    /// Parse an optional operation knob; present-but-malformed is an error
    fn parse_knob<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.knobs.get(name) {
            None => Ok(None),
            Some(value) => parse_value(name, value).map(Some),
        }
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    let name = field.name().unwrap_or("unknown").to_string();
    field
        .text()
        .await
        .map_err(|e| StudioError::invalid_parameter(format!("failed to read field {name}: {e}")))
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| StudioError::invalid_parameter(format!("malformed value for {name}: {value}")))
}

fn parse_format(value: &str) -> Result<OutputFormat> {
    match value.trim().to_ascii_lowercase().as_str() {
        "png" => Ok(OutputFormat::Png),
        "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
        other => Err(StudioError::invalid_parameter(format!(
            "unsupported output format: {other}"
        ))),
    }
}

fn validate_dimension(name: &str, value: u32) -> Result<()> {
    if value == 0 || value > MAX_GENERATION_DIMENSION {
        return Err(StudioError::param_value_error(
            name,
            value,
            "1-2048",
        ));
    }
    Ok(())
}

fn download_response(bytes: Vec<u8>, mime: &str, filename: &str, request_id: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
            (
                header::HeaderName::from_static("x-request-id"),
                request_id.to_string(),
            ),
        ],
        bytes,
    )
        .into_response()
}
