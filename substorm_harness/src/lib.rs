//! Harness for training and evaluating the substorm detector.
//!
//! Renders seeded synthetic Earth-disk scenes with and without auroral
//! activity, runs them through the crop and classification chain, and
//! aggregates precision/recall/F1 across repeated randomized trials.

pub mod eval;
pub mod scene;

pub use eval::{run_evaluation, run_trial, EvalConfig, TrialResult};
pub use scene::{mosaic_scene, random_scene, render_scene, scene_crop_config, SceneConfig};
