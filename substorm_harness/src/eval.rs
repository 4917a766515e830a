//! Repeated randomized evaluation of the crop-and-classify chain.
//!
//! Each trial draws fresh synthetic scenes, trains a model on one batch and
//! scores a held-out batch through the full chain the flight pipeline uses
//! (limb crop, resize, pooled features). Trials run in parallel and the
//! per-trial precision/recall/F1 scores are aggregated to mean and standard
//! deviation.

use crate::scene::{random_scene, scene_crop_config};
use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use shared::image_proc::resize_rgb;
use shared::stats::{summarize, ClassifierScores, ConfusionCounts, ScoreSummary};
use substorm::autocrop::{auto_crop, CropConfig};
use substorm::classify::{grid_features, LogisticModel, TrainConfig, CROP_SIZE};

/// Evaluation run parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalConfig {
    /// Independent trials, each with its own scenes and model
    pub trials: usize,
    /// Training scenes per class per trial
    pub train_scenes: usize,
    /// Held-out test scenes per class per trial
    pub test_scenes: usize,
    /// Base RNG seed; each trial derives its own stream
    pub seed: u64,
    /// Classifier training hyperparameters
    pub train: TrainConfig,
    /// Limb search tuning for the scene scale
    pub crop: CropConfig,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            trials: 10,
            train_scenes: 25,
            test_scenes: 25,
            seed: 7,
            train: TrainConfig::default(),
            crop: scene_crop_config(),
        }
    }
}

/// Outcome of one trial.
#[derive(Debug, Clone)]
pub struct TrialResult {
    /// Confusion counts over the held-out scenes
    pub counts: ConfusionCounts,
    /// The model this trial trained
    pub model: LogisticModel,
}

impl TrialResult {
    pub fn scores(&self) -> ClassifierScores {
        self.counts.scores()
    }
}

/// Crop a scene and pool it into classifier features.
///
/// Returns `None` when the limb search fails; training skips such scenes
/// and evaluation scores them as non-detections.
fn crop_features(frame: &RgbImage, crop: &CropConfig) -> Option<Vec<f32>> {
    let result = auto_crop(frame, crop).ok()?;
    if !result.pointing.is_nominal() {
        return None;
    }
    let resized = resize_rgb(&result.crop, CROP_SIZE, CROP_SIZE);
    Some(grid_features(&resized))
}

/// Draw `count` scenes per class and crop them into labeled feature vectors.
fn labeled_features<R: Rng>(
    count: usize,
    crop: &CropConfig,
    rng: &mut R,
) -> (Vec<Vec<f32>>, Vec<bool>) {
    let mut samples = Vec::with_capacity(2 * count);
    let mut labels = Vec::with_capacity(2 * count);

    for index in 0..2 * count {
        let substorm = index % 2 == 0;
        let (_, frame) = random_scene(substorm, rng);
        match crop_features(&frame, crop) {
            Some(features) => {
                samples.push(features);
                labels.push(substorm);
            }
            None => warn!("Limb search failed on a synthetic scene; skipping"),
        }
    }

    (samples, labels)
}

/// Run one trial: train on fresh scenes, score a held-out batch.
pub fn run_trial(config: &EvalConfig, trial: usize) -> TrialResult {
    // Splitmix-style stream separation so trials are independent.
    let stream = config
        .seed
        .wrapping_add((trial as u64).wrapping_mul(0x9E3779B97F4A7C15));
    let mut rng = ChaCha8Rng::seed_from_u64(stream);

    let (samples, labels) = labeled_features(config.train_scenes, &config.crop, &mut rng);
    let model = LogisticModel::train(&samples, &labels, &config.train);

    let mut counts = ConfusionCounts::new();
    for index in 0..2 * config.test_scenes {
        let substorm = index % 2 == 0;
        let (_, frame) = random_scene(substorm, &mut rng);
        let predicted = match crop_features(&frame, &config.crop) {
            Some(features) => model.score_features(&features) > model.threshold,
            None => false,
        };
        counts.record(substorm, predicted);
    }

    debug!(
        "Trial {trial}: precision {:.3}, recall {:.3}, f1 {:.3}",
        counts.precision(),
        counts.recall(),
        counts.f1()
    );
    TrialResult { counts, model }
}

/// Run all trials in parallel and aggregate their scores.
pub fn run_evaluation(config: &EvalConfig) -> (Vec<TrialResult>, ScoreSummary) {
    let progress = ProgressBar::new(config.trials as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} trials ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let results: Vec<TrialResult> = (0..config.trials)
        .into_par_iter()
        .map(|trial| {
            let result = run_trial(config, trial);
            progress.inc(1);
            result
        })
        .collect();
    progress.finish_and_clear();

    let scores: Vec<ClassifierScores> = results.iter().map(TrialResult::scores).collect();
    let summary = summarize(&scores);
    (results, summary)
}
