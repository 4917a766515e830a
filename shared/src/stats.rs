//! Binary classification statistics.
//!
//! Confusion counting and precision/recall/F1 scoring for the substorm
//! classifier, plus mean/std aggregation across repeated evaluation trials.
//! F1 is the epsilon-guarded harmonic mean of precision and recall, so empty
//! denominators score 0.0 rather than NaN.

use serde::{Deserialize, Serialize};

/// Guard against division by an empty denominator.
const EPSILON: f64 = 1e-9;

/// Confusion matrix counts for a binary classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    /// Substorm present, classifier agreed
    pub true_positives: u64,
    /// No substorm, classifier fired anyway
    pub false_positives: u64,
    /// No substorm, classifier agreed
    pub true_negatives: u64,
    /// Substorm present, classifier missed it
    pub false_negatives: u64,
}

impl ConfusionCounts {
    /// Create an empty set of counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one labeled prediction.
    pub fn record(&mut self, truth: bool, predicted: bool) {
        match (truth, predicted) {
            (true, true) => self.true_positives += 1,
            (false, true) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
            (true, false) => self.false_negatives += 1,
        }
    }

    /// Merge counts from another evaluation run.
    pub fn merge(&mut self, other: &Self) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.true_negatives += other.true_negatives;
        self.false_negatives += other.false_negatives;
    }

    /// Total number of recorded predictions.
    pub fn total(&self) -> u64 {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// Fraction of selected items that were relevant.
    pub fn precision(&self) -> f64 {
        let selected = self.true_positives + self.false_positives;
        self.true_positives as f64 / (selected as f64 + EPSILON)
    }

    /// Fraction of relevant items that were selected.
    pub fn recall(&self) -> f64 {
        let relevant = self.true_positives + self.false_negatives;
        self.true_positives as f64 / (relevant as f64 + EPSILON)
    }

    /// Harmonic mean of precision and recall.
    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        2.0 * p * r / (p + r + EPSILON)
    }

    /// All three scores at once.
    pub fn scores(&self) -> ClassifierScores {
        ClassifierScores {
            precision: self.precision(),
            recall: self.recall(),
            f1: self.f1(),
        }
    }
}

/// Precision, recall and F1 for one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Mean and standard deviation of a score across repeated trials.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreStat {
    pub mean: f64,
    pub std_dev: f64,
}

/// Aggregated precision/recall/F1 statistics over repeated trials.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub trials: usize,
    pub precision: ScoreStat,
    pub recall: ScoreStat,
    pub f1: ScoreStat,
}

fn mean_std(values: &[f64]) -> ScoreStat {
    if values.is_empty() {
        return ScoreStat {
            mean: 0.0,
            std_dev: 0.0,
        };
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;

    ScoreStat {
        mean,
        std_dev: variance.sqrt(),
    }
}

/// Aggregate per-trial scores into mean ± std summaries.
pub fn summarize(scores: &[ClassifierScores]) -> ScoreSummary {
    let precision: Vec<f64> = scores.iter().map(|s| s.precision).collect();
    let recall: Vec<f64> = scores.iter().map(|s| s.recall).collect();
    let f1: Vec<f64> = scores.iter().map(|s| s.f1).collect();

    ScoreSummary {
        trials: scores.len(),
        precision: mean_std(&precision),
        recall: mean_std(&recall),
        f1: mean_std(&f1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perfect_classifier() {
        let mut counts = ConfusionCounts::new();
        for _ in 0..10 {
            counts.record(true, true);
            counts.record(false, false);
        }

        assert_relative_eq!(counts.precision(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(counts.recall(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(counts.f1(), 1.0, epsilon = 1e-6);
        assert_eq!(counts.total(), 20);
    }

    #[test]
    fn test_known_confusion_matrix() {
        let counts = ConfusionCounts {
            true_positives: 8,
            false_positives: 2,
            true_negatives: 7,
            false_negatives: 3,
        };

        assert_relative_eq!(counts.precision(), 0.8, epsilon = 1e-6);
        assert_relative_eq!(counts.recall(), 8.0 / 11.0, epsilon = 1e-6);

        let p = 0.8;
        let r = 8.0 / 11.0;
        assert_relative_eq!(counts.f1(), 2.0 * p * r / (p + r), epsilon = 1e-6);
    }

    #[test]
    fn test_empty_denominators_score_zero() {
        // Classifier never fires and no positives exist
        let counts = ConfusionCounts {
            true_negatives: 5,
            ..Default::default()
        };

        assert_eq!(counts.precision(), 0.0);
        assert_eq!(counts.recall(), 0.0);
        assert_eq!(counts.f1(), 0.0);
        assert!(counts.f1().is_finite());
    }

    #[test]
    fn test_merge() {
        let mut a = ConfusionCounts::new();
        a.record(true, true);
        let mut b = ConfusionCounts::new();
        b.record(true, false);
        b.record(false, true);

        a.merge(&b);
        assert_eq!(a.true_positives, 1);
        assert_eq!(a.false_negatives, 1);
        assert_eq!(a.false_positives, 1);
        assert_eq!(a.total(), 3);
    }

    #[test]
    fn test_summarize() {
        let scores = vec![
            ClassifierScores {
                precision: 0.8,
                recall: 0.6,
                f1: 0.7,
            },
            ClassifierScores {
                precision: 1.0,
                recall: 0.8,
                f1: 0.9,
            },
        ];

        let summary = summarize(&scores);
        assert_eq!(summary.trials, 2);
        assert_relative_eq!(summary.precision.mean, 0.9, epsilon = 1e-9);
        assert_relative_eq!(summary.precision.std_dev, 0.1, epsilon = 1e-9);
        assert_relative_eq!(summary.f1.mean, 0.8, epsilon = 1e-9);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.trials, 0);
        assert_eq!(summary.f1.mean, 0.0);
    }
}
