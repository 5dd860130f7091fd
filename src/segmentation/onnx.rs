//! ONNX Runtime segmentation backend
//!
//! Runs a pretrained salient-object segmentation model (ISNet-style: NCHW
//! float input, single-channel saliency output) through ONNX Runtime. The
//! model is an opaque collaborator; this module only handles tensor
//! conversion on either side of the session.

use super::{SegmentationBackend, SegmentationMask};
use crate::error::{Result, StudioError};
use image::DynamicImage;
use log::{debug, info};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::{Path, PathBuf};

/// Model input side length (square), ISNet convention
const MODEL_INPUT_SIZE: u32 = 1024;

/// ImageNet channel normalization used by the pretrained weights
const NORM_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const NORM_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// ONNX Runtime backend for pretrained segmentation models
pub struct OnnxSegmenter {
    model_path: PathBuf,
    session: Option<Session>,
}

impl OnnxSegmenter {
    /// Create a backend for the model at the given path
    ///
    /// The session is created lazily on first use so construction stays
    /// cheap; a missing or unloadable model surfaces as
    /// `SegmentationUnavailable` at segmentation time.
    #[must_use]
    pub fn new<P: AsRef<Path>>(model_path: P) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            session: None,
        }
    }

    fn session(&mut self) -> Result<&mut Session> {
        if self.session.is_none() {
            if !self.model_path.exists() {
                return Err(StudioError::segmentation_unavailable(format!(
                    "model file not found: {}",
                    self.model_path.display()
                )));
            }

            let session = Session::builder()
                .map_err(|e| {
                    StudioError::segmentation_unavailable(format!(
                        "failed to create session builder: {e}"
                    ))
                })?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(|e| {
                    StudioError::segmentation_unavailable(format!(
                        "failed to set optimization level: {e}"
                    ))
                })?
                .commit_from_file(&self.model_path)
                .map_err(|e| {
                    StudioError::segmentation_unavailable(format!(
                        "failed to load model '{}': {e}",
                        self.model_path.display()
                    ))
                })?;

            info!("loaded segmentation model {}", self.model_path.display());
            self.session = Some(session);
        }

        self.session
            .as_mut()
            .ok_or_else(|| StudioError::internal("session missing after initialization"))
    }

    /// Resize to the model's square input and normalize into an NCHW tensor
    fn preprocess(image: &DynamicImage) -> Array4<f32> {
        let size = MODEL_INPUT_SIZE;
        let resized = image::imageops::resize(
            &image.to_rgb8(),
            size,
            size,
            image::imageops::FilterType::Triangle,
        );

        let side = size as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (f32::from(pixel[c]) / 255.0 - NORM_MEAN[c]) / NORM_STD[c];
            }
        }
        tensor
    }

    /// Min-max normalize the saliency map into 0-255 grayscale at the
    /// original image dimensions
    fn postprocess(
        saliency: &ndarray::ArrayViewD<'_, f32>,
        width: u32,
        height: u32,
    ) -> Result<SegmentationMask> {
        let values: Vec<f32> = saliency.iter().copied().collect();
        let side = MODEL_INPUT_SIZE as usize;
        if values.len() < side * side {
            return Err(StudioError::internal(format!(
                "unexpected model output size: {}",
                values.len()
            )));
        }

        let (mut min, mut max) = (f32::INFINITY, f32::NEG_INFINITY);
        for &v in &values[..side * side] {
            min = min.min(v);
            max = max.max(v);
        }
        let range = if (max - min).abs() < f32::EPSILON {
            1.0
        } else {
            max - min
        };

        let data: Vec<u8> = values[..side * side]
            .iter()
            .map(|&v| (((v - min) / range) * 255.0).round() as u8)
            .collect();

        let mask = SegmentationMask::new(data, (MODEL_INPUT_SIZE, MODEL_INPUT_SIZE))?;
        mask.resize(width, height)
    }
}

impl SegmentationBackend for OnnxSegmenter {
    fn segment(&mut self, image: &DynamicImage) -> Result<SegmentationMask> {
        let (width, height) = (image.width(), image.height());
        let tensor = Self::preprocess(image);
        let session = self.session()?;

        debug!("running segmentation inference on {width}x{height} input");
        let input_value = Value::from_array(tensor).map_err(|e| {
            StudioError::internal(format!("failed to convert input tensor: {e}"))
        })?;

        let outputs = session.run(ort::inputs![input_value]).map_err(|e| {
            StudioError::segmentation_unavailable(format!("inference failed: {e}"))
        })?;

        let keys: Vec<_> = outputs.keys().collect();
        let first_key = keys
            .first()
            .ok_or_else(|| StudioError::internal("model produced no output tensors"))?;
        let saliency = outputs
            .get(first_key)
            .ok_or_else(|| StudioError::internal("first output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| {
                StudioError::internal(format!("failed to extract output tensor: {e}"))
            })?;

        Self::postprocess(&saliency.view(), width, height)
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}
