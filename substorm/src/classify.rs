//! Binary substorm classification over pooled intensity features.
//!
//! The downlink decision needs a score in [0, 1] for a 256x256 crop and a
//! threshold; everything else about the model is behind the
//! [`SubstormClassifier`] trait. The provided [`LogisticModel`] is logistic
//! regression over an 8x8 mean-pooled intensity grid, trained offline (or by
//! the evaluation harness) and carried as a JSON model file.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use shared::image_proc::grayscale;
use std::path::Path;
use thiserror::Error;

/// Side of the pooled feature grid.
pub const FEATURE_GRID: usize = 8;

/// Number of features extracted from a crop.
pub const FEATURE_COUNT: usize = FEATURE_GRID * FEATURE_GRID;

/// Crop side length expected by the classifier, pixels.
pub const CROP_SIZE: u32 = 256;

/// Detection decision threshold used in flight.
pub const DETECTION_THRESHOLD: f32 = 0.5;

/// Errors loading or applying a classifier model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("model file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("model has {got} weights, expected {expected}")]
    WeightCount { expected: usize, got: usize },
}

/// Scores crops for auroral substorm activity.
pub trait SubstormClassifier {
    /// Substorm probability for the crop, in (0, 1).
    fn score(&self, crop: &RgbImage) -> f32;

    /// Decision threshold applied by [`Self::is_substorm`].
    fn threshold(&self) -> f32 {
        DETECTION_THRESHOLD
    }

    /// Thresholded detection decision.
    fn is_substorm(&self, crop: &RgbImage) -> bool {
        self.score(crop) > self.threshold()
    }
}

/// Mean-pool a crop's grayscale intensities into the feature grid.
///
/// The crop is divided into `FEATURE_GRID` x `FEATURE_GRID` cells (any crop
/// size works; cells absorb the remainder pixels) and each cell's mean
/// intensity, normalized to [0, 1], becomes one feature.
pub fn grid_features(crop: &RgbImage) -> Vec<f32> {
    let gray = grayscale(crop);
    let (height, width) = gray.dim();

    let mut features = vec![0.0f32; FEATURE_COUNT];
    if height == 0 || width == 0 {
        return features;
    }

    for (index, feature) in features.iter_mut().enumerate() {
        let grid_row = index / FEATURE_GRID;
        let grid_col = index % FEATURE_GRID;

        let row0 = grid_row * height / FEATURE_GRID;
        let row1 = ((grid_row + 1) * height / FEATURE_GRID).max(row0 + 1);
        let col0 = grid_col * width / FEATURE_GRID;
        let col1 = ((grid_col + 1) * width / FEATURE_GRID).max(col0 + 1);

        let mut sum = 0.0f32;
        for row in row0..row1 {
            for col in col0..col1 {
                sum += gray[[row, col]];
            }
        }
        *feature = sum / ((row1 - row0) * (col1 - col0)) as f32 / 255.0;
    }

    features
}

/// Training hyperparameters for [`LogisticModel::train`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Full passes over the training set
    pub epochs: usize,
    /// Gradient step size
    pub learning_rate: f32,
    /// L2 weight penalty
    pub l2: f32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 200,
            learning_rate: 0.5,
            l2: 1e-4,
        }
    }
}

/// Logistic regression over grid features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    /// One weight per grid feature
    pub weights: Vec<f32>,
    /// Bias term
    pub bias: f32,
    /// Decision threshold
    pub threshold: f32,
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticModel {
    /// A zero-weight model scoring 0.5 everywhere.
    pub fn zeroed() -> Self {
        Self {
            weights: vec![0.0; FEATURE_COUNT],
            bias: 0.0,
            threshold: DETECTION_THRESHOLD,
        }
    }

    /// Load a model from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let contents = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&contents)?;
        model.check_dimensions()?;
        Ok(model)
    }

    /// Save the model as JSON.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn check_dimensions(&self) -> Result<(), ModelError> {
        if self.weights.len() != FEATURE_COUNT {
            return Err(ModelError::WeightCount {
                expected: FEATURE_COUNT,
                got: self.weights.len(),
            });
        }
        Ok(())
    }

    /// Score a feature vector directly.
    ///
    /// # Panics
    /// Panics if the feature count does not match the model.
    pub fn score_features(&self, features: &[f32]) -> f32 {
        assert_eq!(features.len(), self.weights.len(), "feature count mismatch");

        let z: f32 = self
            .weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f32>()
            + self.bias;
        sigmoid(z)
    }

    /// Fit a model to labeled feature vectors by batch gradient descent.
    ///
    /// Deterministic for a fixed sample order. Labels are `true` for
    /// substorm-present samples.
    pub fn train(samples: &[Vec<f32>], labels: &[bool], config: &TrainConfig) -> Self {
        assert_eq!(samples.len(), labels.len(), "sample/label count mismatch");

        let mut model = Self::zeroed();
        if samples.is_empty() {
            return model;
        }

        let n = samples.len() as f32;
        for _ in 0..config.epochs {
            let mut weight_grad = vec![0.0f32; FEATURE_COUNT];
            let mut bias_grad = 0.0f32;

            for (features, &label) in samples.iter().zip(labels) {
                let error = model.score_features(features) - if label { 1.0 } else { 0.0 };
                for (grad, &x) in weight_grad.iter_mut().zip(features) {
                    *grad += error * x;
                }
                bias_grad += error;
            }

            for (weight, grad) in model.weights.iter_mut().zip(&weight_grad) {
                *weight -= config.learning_rate * (grad / n + config.l2 * *weight);
            }
            model.bias -= config.learning_rate * bias_grad / n;
        }

        model
    }
}

impl SubstormClassifier for LogisticModel {
    fn score(&self, crop: &RgbImage) -> f32 {
        self.score_features(&grid_features(crop))
    }

    fn threshold(&self) -> f32 {
        self.threshold
    }
}
