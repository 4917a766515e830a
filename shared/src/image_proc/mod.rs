//! Imaging primitives for the onboard processing chain.
//!
//! Everything here operates on the crate's standard frame types: `Array2<u8>`
//! Bayer mosaics straight off the pipe, `Array2<f32>` grayscale working
//! frames, and `image::RgbImage` color frames headed for the classifier and
//! the downlink encoder.

pub mod blur;
pub mod demosaic;
pub mod geometry;

pub use blur::gaussian_blur;
pub use demosaic::demosaic_bilinear;
pub use geometry::{crop_square, grayscale, pad_border, resize_rgb};
