//! Deterministic segmentation backends for testing
//!
//! These stand in for the network-trained model so pipeline behavior can be
//! asserted without model weights.

use super::{SegmentationBackend, SegmentationMask};
use crate::error::Result;
use image::DynamicImage;

/// Fake backend that classifies a fixed axis-aligned rectangle as
/// foreground and everything else as background
pub struct FakeSegmenter {
    rect: Option<(u32, u32, u32, u32)>,
}

impl FakeSegmenter {
    /// Mark the rectangle at (x, y) with the given width/height as
    /// foreground; coordinates are clipped to the image
    #[must_use]
    pub fn foreground_rect(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            rect: Some((x, y, width, height)),
        }
    }

    /// Mark the whole frame as foreground
    #[must_use]
    pub fn all_foreground() -> Self {
        Self { rect: None }
    }
}

impl SegmentationBackend for FakeSegmenter {
    fn segment(&mut self, image: &DynamicImage) -> Result<SegmentationMask> {
        let (width, height) = (image.width(), image.height());
        let mut data = vec![0u8; width as usize * height as usize];

        match self.rect {
            None => data.fill(255),
            Some((rx, ry, rw, rh)) => {
                for y in ry..(ry + rh).min(height) {
                    for x in rx..(rx + rw).min(width) {
                        data[(y * width + x) as usize] = 255;
                    }
                }
            },
        }

        SegmentationMask::new(data, (width, height))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
