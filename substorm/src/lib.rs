//! Substorm detection engine.
//!
//! Three stages, each usable on its own:
//!
//! - [`hough`]: gradient Hough circle transform, the circle-detection
//!   primitive.
//! - [`autocrop`]: adaptive Earth-limb search with vote-threshold backoff,
//!   square crop extraction and pointing-error classification.
//! - [`classify`]: binary substorm classifier over pooled intensity
//!   features, behind the [`classify::SubstormClassifier`] trait so the
//!   pipeline stays independent of the model family.

pub mod autocrop;
pub mod classify;
pub mod hough;

pub use autocrop::{auto_crop, AutoCrop, CropConfig, CropError, Pointing};
pub use classify::{LogisticModel, SubstormClassifier};
pub use hough::{detect_circles, Circle, HoughConfig};
