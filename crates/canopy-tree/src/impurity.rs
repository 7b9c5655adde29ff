//! Gini impurity for binary label distributions.

use crate::branch::Impurity;

/// Gini impurity of a binary distribution with positive-class share `p`: `2p(1 - p)`.
///
/// Ranges over [0.0, 0.5], reaching 0.5 at `p = 0.5` and zero at `p ∈ {0, 1}`.
#[must_use]
pub fn gini(p: f64) -> f64 {
    2.0 * p * (1.0 - p)
}

/// Mean of `labels`, skipping NaN entries.
///
/// Returns `None` when no non-NaN label remains.
#[must_use]
pub fn mean_label(labels: &[f64]) -> Option<f64> {
    let (sum, count) = labels
        .iter()
        .filter(|l| !l.is_nan())
        .fold((0.0, 0usize), |(s, n), &l| (s + l, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Gini impurity of a label sequence.
///
/// Returns `None` when the sequence is empty after removing NaN entries.
#[must_use]
pub fn gini_of_labels(labels: &[f64]) -> Option<Impurity> {
    mean_label(labels).map(|p| Impurity::new(gini(p)))
}

/// Size-weighted impurity of a two-way split.
///
/// An absent side (`None`, as opposed to an empty slice) is ignored and the
/// impurity of the other side is returned alone. When both sides are present
/// the result is undefined if either side has no usable labels.
#[must_use]
pub fn weighted_gini(left: Option<&[f64]>, right: Option<&[f64]>) -> Option<Impurity> {
    match (left, right) {
        (None, None) => None,
        (Some(side), None) | (None, Some(side)) => gini_of_labels(side),
        (Some(l), Some(r)) => {
            let gl = gini_of_labels(l)?;
            let gr = gini_of_labels(r)?;
            let nl = l.len() as f64;
            let nr = r.len() as f64;
            Some(Impurity::new((nl * gl.value() + nr * gr.value()) / (nl + nr)))
        }
    }
}
