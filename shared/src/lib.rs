//! Shared imaging primitives and statistics for the aurora IPS modules.
//!
//! This crate carries the pieces every stage of the onboard pipeline and the
//! evaluation harness agree on:
//!
//! - **Frame conventions**: grayscale frames are `ndarray::Array2<f32>` in
//!   row-major (height, width) order, raw sensor frames are `Array2<u8>`
//!   Bayer mosaics, and color images use `image::RgbImage`.
//! - **Imaging primitives**: demosaic, Gaussian blur, padding, cropping and
//!   resizing used by the Earth-limb auto-crop stage.
//! - **Classification statistics**: confusion counts and
//!   precision/recall/F1 aggregation for repeated-trial evaluation.

pub mod image_proc;
pub mod image_size;
pub mod stats;

pub use image_size::ImageSize;
