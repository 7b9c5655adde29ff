use crate::branch::{Direction, FeatureIndex, Impurity};
use crate::dataset::Dataset;
use crate::error::TreeError;
use crate::impurity::{mean_label, weighted_gini};

/// Default number of grid thresholds tried per feature.
pub const DEFAULT_N_CANDIDATES: usize = 50;

/// Best threshold found on a single feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSplit {
    /// Weighted Gini impurity of the split.
    pub impurity: Impurity,
    /// Threshold value: `value <= threshold` goes left.
    pub threshold: f64,
    /// Mean label of the left (`<= threshold`) partition.
    pub left_prediction: f64,
    /// Mean label of the right (`> threshold`) partition.
    pub right_prediction: f64,
    /// Number of observations going left.
    pub n_left: usize,
    /// Number of observations going right.
    pub n_right: usize,
}

/// Best split of a node across its candidate features.
#[derive(Debug, Clone)]
pub struct BestSplit {
    /// Winning feature.
    pub feature: FeatureIndex,
    /// Winning threshold and its partition statistics.
    pub split: FeatureSplit,
    /// Dataset rows going to the left child.
    pub left_rows: Vec<usize>,
    /// Dataset rows going to the right child.
    pub right_rows: Vec<usize>,
}

/// `n_candidates` equally spaced thresholds spanning `[min, max]` inclusive.
///
/// A single candidate yields `[min]`. The last candidate is exactly `max`.
#[must_use]
pub fn threshold_grid(min: f64, max: f64, n_candidates: usize) -> Vec<f64> {
    match n_candidates {
        0 => Vec::new(),
        1 => vec![min],
        n => {
            let step = (max - min) / (n - 1) as f64;
            (0..n)
                .map(|k| if k == n - 1 { max } else { min + step * k as f64 })
                .collect()
        }
    }
}

/// Evaluate one grid threshold.
///
/// Fails with [`TreeError::EmptyPartition`] when either side is empty; returns
/// `Ok(None)` when the impurity is undefined.
fn evaluate_candidate(
    values: &[f64],
    labels: &[f64],
    threshold: f64,
    left: &mut Vec<f64>,
    right: &mut Vec<f64>,
) -> Result<Option<FeatureSplit>, TreeError> {
    left.clear();
    right.clear();
    for (&v, &l) in values.iter().zip(labels) {
        match Direction::route(v, threshold) {
            Direction::Left => left.push(l),
            Direction::Right => right.push(l),
        }
    }
    if left.is_empty() || right.is_empty() {
        return Err(TreeError::EmptyPartition { threshold });
    }

    let Some(impurity) = weighted_gini(Some(left), Some(right)) else {
        return Ok(None);
    };
    let (Some(left_prediction), Some(right_prediction)) = (mean_label(left), mean_label(right))
    else {
        return Ok(None);
    };

    Ok(Some(FeatureSplit {
        impurity,
        threshold,
        left_prediction,
        right_prediction,
        n_left: left.len(),
        n_right: right.len(),
    }))
}

/// Grid-search one feature for the impurity-minimizing threshold.
///
/// Tries [`threshold_grid`] over the range of `values`. Candidates with an
/// empty side or an undefined impurity are skipped; on ties the first (lowest)
/// threshold wins.
///
/// # Errors
///
/// | Variant                              | When                                       |
/// |--------------------------------------|--------------------------------------------|
/// | [`TreeError::InvalidCandidateCount`] | `n_candidates` is zero                     |
/// | [`TreeError::LabelCountMismatch`]    | `values` and `labels` differ in length     |
/// | [`TreeError::DegenerateSplit`]       | no candidate yields a defined impurity     |
pub fn optimal_split_for_feature(
    values: &[f64],
    labels: &[f64],
    n_candidates: usize,
) -> Result<FeatureSplit, TreeError> {
    if n_candidates == 0 {
        return Err(TreeError::InvalidCandidateCount { n_candidates });
    }
    if values.len() != labels.len() {
        return Err(TreeError::LabelCountMismatch {
            rows: values.len(),
            labels: labels.len(),
        });
    }
    let degenerate = TreeError::DegenerateSplit {
        n_observations: values.len(),
    };

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !(min.is_finite() && max.is_finite()) {
        return Err(degenerate);
    }

    let mut left = Vec::with_capacity(values.len());
    let mut right = Vec::with_capacity(values.len());
    let mut best: Option<FeatureSplit> = None;

    for threshold in threshold_grid(min, max, n_candidates) {
        let candidate = match evaluate_candidate(values, labels, threshold, &mut left, &mut right) {
            Ok(Some(c)) => c,
            Ok(None) | Err(TreeError::EmptyPartition { .. }) => continue,
            Err(e) => return Err(e),
        };
        if best
            .as_ref()
            .is_none_or(|b| candidate.impurity < b.impurity)
        {
            best = Some(candidate);
        }
    }

    best.ok_or(degenerate)
}

/// Choose the best `(feature, threshold)` pair for a node.
///
/// Runs [`optimal_split_for_feature`] on each of `features` (column positions,
/// searched in the given order) restricted to `rows`. Features whose search is
/// degenerate are skipped; ties go to the earlier feature.
///
/// # Errors
///
/// Returns [`TreeError::DegenerateSplit`] if no feature admits a split, or
/// [`TreeError::InvalidCandidateCount`] if `n_candidates` is zero.
pub fn best_feature_and_split(
    dataset: &Dataset,
    rows: &[usize],
    features: &[usize],
    n_candidates: usize,
) -> Result<BestSplit, TreeError> {
    let all_labels = dataset.labels();
    let labels: Vec<f64> = rows.iter().map(|&r| all_labels[r]).collect();

    let mut best: Option<(usize, FeatureSplit)> = None;
    for &feature in features {
        let column = dataset.column(feature);
        let values: Vec<f64> = rows.iter().map(|&r| column[r]).collect();
        let split = match optimal_split_for_feature(&values, &labels, n_candidates) {
            Ok(s) => s,
            Err(TreeError::DegenerateSplit { .. }) => continue,
            Err(e) => return Err(e),
        };
        if best
            .as_ref()
            .is_none_or(|(_, b)| split.impurity < b.impurity)
        {
            best = Some((feature, split));
        }
    }

    let (feature, split) = best.ok_or(TreeError::DegenerateSplit {
        n_observations: rows.len(),
    })?;

    let column = dataset.column(feature);
    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        rows.iter().partition(|&&r| {
            Direction::route(column[r], split.threshold) == Direction::Left
        });

    Ok(BestSplit {
        feature: FeatureIndex::new(feature),
        split,
        left_rows,
        right_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_spans_range_inclusive() {
        let grid = threshold_grid(-1.0, 1.0, 5);
        assert_eq!(grid.len(), 5);
        assert!((grid[0] + 1.0).abs() < f64::EPSILON);
        assert!((grid[2]).abs() < 1e-12);
        assert!((grid[4] - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn single_candidate_grid_is_min() {
        assert_eq!(threshold_grid(3.0, 9.0, 1), vec![3.0]);
    }

    #[test]
    fn separable_feature_has_zero_impurity() {
        let values = [-1.0, -0.5, 0.5, 1.0];
        let labels = [0.0, 0.0, 1.0, 1.0];
        let split = optimal_split_for_feature(&values, &labels, DEFAULT_N_CANDIDATES).unwrap();
        assert!(split.impurity.value().abs() < f64::EPSILON);
        assert!(split.threshold > -0.5 && split.threshold < 0.5, "t = {}", split.threshold);
        assert!(split.left_prediction.abs() < f64::EPSILON);
        assert!((split.right_prediction - 1.0).abs() < f64::EPSILON);
        assert_eq!((split.n_left, split.n_right), (2, 2));
    }

    #[test]
    fn ties_resolve_to_lowest_threshold() {
        // Every threshold in [1, 2) separates perfectly; the grid starts at 1.
        let values = [1.0, 2.0];
        let labels = [0.0, 1.0];
        let split = optimal_split_for_feature(&values, &labels, 5).unwrap();
        assert!((split.threshold - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn constant_feature_is_degenerate() {
        let values = [5.0, 5.0, 5.0];
        let labels = [0.0, 1.0, 1.0];
        let err = optimal_split_for_feature(&values, &labels, 10).unwrap_err();
        assert!(matches!(err, TreeError::DegenerateSplit { n_observations: 3 }));
    }

    #[test]
    fn missing_labels_are_degenerate() {
        let values = [1.0, 2.0, 3.0];
        let labels = [f64::NAN; 3];
        let err = optimal_split_for_feature(&values, &labels, 10).unwrap_err();
        assert!(matches!(err, TreeError::DegenerateSplit { .. }));
    }

    #[test]
    fn zero_candidates_rejected() {
        let err = optimal_split_for_feature(&[1.0, 2.0], &[0.0, 1.0], 0).unwrap_err();
        assert!(matches!(err, TreeError::InvalidCandidateCount { n_candidates: 0 }));
    }

    #[test]
    fn length_mismatch_rejected() {
        let err = optimal_split_for_feature(&[1.0, 2.0], &[0.0], 5).unwrap_err();
        assert!(matches!(err, TreeError::LabelCountMismatch { .. }));
    }

    #[test]
    fn picks_informative_feature() {
        let rows = vec![
            vec![0.0, 1.0],
            vec![1.0, 2.0],
            vec![0.0, 3.0],
            vec![1.0, 10.0],
            vec![0.0, 11.0],
            vec![1.0, 12.0],
        ];
        let labels = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let ds = Dataset::from_unnamed_rows(&rows, &labels).unwrap();
        let all: Vec<usize> = (0..6).collect();
        let best = best_feature_and_split(&ds, &all, &[0, 1], DEFAULT_N_CANDIDATES).unwrap();
        assert_eq!(best.feature.index(), 1);
        assert_eq!(best.left_rows, vec![0, 1, 2]);
        assert_eq!(best.right_rows, vec![3, 4, 5]);
        assert!(best.split.impurity.value().abs() < f64::EPSILON);
    }

    #[test]
    fn value_on_threshold_goes_left() {
        // Grid is exactly [0, 1, 2, 3]; the winning threshold 1.0 equals a value.
        let rows = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let labels = [0.0, 0.0, 1.0, 1.0];
        let ds = Dataset::from_unnamed_rows(&rows, &labels).unwrap();
        let best = best_feature_and_split(&ds, &[0, 1, 2, 3], &[0], 4).unwrap();
        assert!((best.split.threshold - 1.0).abs() < f64::EPSILON);
        assert_eq!((best.split.n_left, best.split.n_right), (2, 2));
        assert_eq!(best.left_rows, vec![0, 1]);
        assert_eq!(best.right_rows, vec![2, 3]);
        assert_eq!(Direction::route(1.0, best.split.threshold), Direction::Left);
    }

    #[test]
    fn feature_ties_go_to_first_searched() {
        // Both columns separate the labels identically.
        let rows = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let ds = Dataset::from_unnamed_rows(&rows, &[0.0, 1.0]).unwrap();
        let best = best_feature_and_split(&ds, &[0, 1], &[0, 1], 10).unwrap();
        assert_eq!(best.feature.index(), 0);
        let best = best_feature_and_split(&ds, &[0, 1], &[1, 0], 10).unwrap();
        assert_eq!(best.feature.index(), 1);
    }

    #[test]
    fn all_constant_features_are_degenerate() {
        let rows = vec![vec![1.0, 2.0], vec![1.0, 2.0]];
        let ds = Dataset::from_unnamed_rows(&rows, &[0.0, 1.0]).unwrap();
        let err = best_feature_and_split(&ds, &[0, 1], &[0, 1], 10).unwrap_err();
        assert!(matches!(err, TreeError::DegenerateSplit { n_observations: 2 }));
    }
}
