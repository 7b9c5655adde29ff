//! Binary confusion matrix and per-class classification metrics.

use std::fmt;

use crate::error::TreeError;

/// Score cutoff used by [`accuracy`].
pub const DEFAULT_CUTOFF: f64 = 0.5;

/// A 2×2 confusion matrix for binary classification.
///
/// Entry `matrix[true][predicted]` counts observations with true label `true`
/// predicted as `predicted`. A score at or above the cutoff predicts class 1.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    matrix: [[usize; 2]; 2],
    n_skipped: usize,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone)]
pub struct ClassMetrics {
    /// The class (0 or 1).
    pub class: usize,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true observations for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true observations in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from 0/1 labels and optional scores.
    ///
    /// Rows whose score is `None` are skipped and counted in [`ConfusionMatrix::n_skipped`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::EmptyDataset`] | zero labels provided |
    /// | [`TreeError::LabelCountMismatch`] | `scores.len() != labels.len()` |
    /// | [`TreeError::InvalidLabel`] | a label is not 0 or 1 |
    pub fn from_scores(
        labels: &[f64],
        scores: &[Option<f64>],
        cutoff: f64,
    ) -> Result<Self, TreeError> {
        if labels.is_empty() {
            return Err(TreeError::EmptyDataset);
        }
        if scores.len() != labels.len() {
            return Err(TreeError::LabelCountMismatch {
                rows: scores.len(),
                labels: labels.len(),
            });
        }
        let mut matrix = [[0usize; 2]; 2];
        let mut n_skipped = 0;
        for (row, (&label, score)) in labels.iter().zip(scores).enumerate() {
            let truth = match label {
                l if l == 0.0 => 0,
                l if l == 1.0 => 1,
                value => return Err(TreeError::InvalidLabel { row, value }),
            };
            match score {
                Some(s) => matrix[truth][usize::from(*s >= cutoff)] += 1,
                None => n_skipped += 1,
            }
        }
        Ok(Self { matrix, n_skipped })
    }

    /// Build a confusion matrix from 0/1 labels and fully defined scores.
    ///
    /// # Errors
    ///
    /// Same as [`ConfusionMatrix::from_scores`].
    pub fn from_predictions(labels: &[f64], scores: &[f64], cutoff: f64) -> Result<Self, TreeError> {
        let scores: Vec<Option<f64>> = scores.iter().copied().map(Some).collect();
        Self::from_scores(labels, &scores, cutoff)
    }

    /// Overall accuracy over the scored rows.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct = self.matrix[0][0] + self.matrix[1][1];
        let total = self.n_scored();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..2)
            .map(|c| {
                let other = 1 - c;
                let tp = self.matrix[c][c];
                let fp = self.matrix[other][c];
                let fn_ = self.matrix[c][other];
                let support = tp + fn_;
                let precision = if tp + fp == 0 {
                    0.0
                } else {
                    tp as f64 / (tp + fp) as f64
                };
                let recall = if support == 0 {
                    0.0
                } else {
                    tp as f64 / support as f64
                };
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        self.matrix
    }

    /// Return the number of rows that were scored.
    #[must_use]
    pub fn n_scored(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Return the number of rows skipped for lack of a score.
    #[must_use]
    pub fn n_skipped(&self) -> usize {
        self.n_skipped
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>8} {:>7} {:>7}", "", "pred_0", "pred_1")?;
        for (i, row) in self.matrix.iter().enumerate() {
            writeln!(f, "{:>8} {:>7} {:>7}", format!("true_{i}"), row[0], row[1])?;
        }
        Ok(())
    }
}

/// Fraction of rows whose score, cut at 0.5, matches the label.
///
/// # Errors
///
/// Same as [`ConfusionMatrix::from_predictions`].
pub fn accuracy(labels: &[f64], scores: &[f64]) -> Result<f64, TreeError> {
    Ok(ConfusionMatrix::from_predictions(labels, scores, DEFAULT_CUTOFF)?.accuracy())
}
