//! Adapter services around the core pipeline

pub mod io;

pub use io::{decode_image, encode_image, flatten_alpha};
