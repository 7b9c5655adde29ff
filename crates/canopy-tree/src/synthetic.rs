//! Seeded synthetic datasets for demonstrations, tests, and benchmarks.
//!
//! Every generator panics when asked for zero observations.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::dataset::Dataset;

fn uniform_pair(rng: &mut impl Rng) -> (f64, f64) {
    (rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0))
}

fn two_feature(rows: Vec<Vec<f64>>, labels: Vec<f64>) -> Dataset {
    let names = vec!["X1".to_string(), "X2".to_string()];
    Dataset::from_rows(names, &rows, &labels).expect("generated rows satisfy the schema")
}

/// `n` points with `X1, X2 ~ U[-1, 1]`; label 1 iff `round(X1) == round(X2)`.
///
/// Rounding half away from zero gives a 3×3 checkerboard of axis-aligned cells.
#[must_use]
pub fn checkerboard(n: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (rows, labels) = (0..n)
        .map(|_| {
            let (x1, x2) = uniform_pair(&mut rng);
            let label = if x1.round() == x2.round() { 1.0 } else { 0.0 };
            (vec![x1, x2], label)
        })
        .unzip();
    two_feature(rows, labels)
}

/// `n` points with `X1, X2 ~ U[-1, 1]`; label 1 iff `X1 > X2`.
#[must_use]
pub fn angled(n: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (rows, labels) = (0..n)
        .map(|_| {
            let (x1, x2) = uniform_pair(&mut rng);
            (vec![x1, x2], if x1 > x2 { 1.0 } else { 0.0 })
        })
        .unzip();
    two_feature(rows, labels)
}

/// Class-imbalanced data with label noise.
///
/// `n_features` columns `~ U[-1, 1]`. The clean label is 1 when the mean of
/// the first two features exceeds the quantile giving `positive_rate`
/// positives; each label is then flipped with probability `flip_rate`.
#[must_use]
pub fn noisy_imbalanced(
    n: usize,
    n_features: usize,
    positive_rate: f64,
    flip_rate: f64,
    seed: u64,
) -> Dataset {
    let n_features = n_features.max(2);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    // Mean of two U[-1, 1] is triangular on [-1, 1]; invert its upper tail.
    let p = positive_rate.clamp(0.0, 1.0);
    let cut = if p <= 0.5 {
        1.0 - (2.0 * p).sqrt()
    } else {
        (2.0 * (1.0 - p)).sqrt() - 1.0
    };

    let mut rows = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let row: Vec<f64> = (0..n_features).map(|_| rng.gen_range(-1.0..=1.0)).collect();
        let clean = (row[0] + row[1]) / 2.0 > cut;
        let noisy = clean ^ rng.gen_bool(flip_rate.clamp(0.0, 1.0));
        rows.push(row);
        labels.push(if noisy { 1.0 } else { 0.0 });
    }
    let names = (1..=n_features).map(|i| format!("X{i}")).collect();
    Dataset::from_rows(names, &rows, &labels).expect("generated rows satisfy the schema")
}
