//! Deterministic pixel-level transform stages
//!
//! Every filter here is a pure function of its inputs: same image and
//! parameters always yield the same output, with no side effects. Each stage
//! produces a new image; inputs are never mutated in place.

pub mod median;
pub mod retouch;

pub use median::median_denoise;
pub use retouch::retouch;
