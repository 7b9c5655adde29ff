//! Configuration builder for bagged and random-forest ensembles.

use crate::dataset::Dataset;
use crate::ensemble::{Ensemble, EnsemblePrediction};
use crate::error::TreeError;
use crate::split::DEFAULT_N_CANDIDATES;
use crate::tree::TreeConfig;

/// Strategy for the number of features drawn at each branch of a replicate tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MaxFeatures {
    /// Every branch searches all features (bagging).
    All,
    /// `ceil(sqrt(n_features))`, at least 2 and at most `n_features` (random forest).
    SqrtAtLeastTwo,
    /// A fixed count.
    Fixed(usize),
}

impl MaxFeatures {
    /// Resolve to a concrete per-branch feature count.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidMaxFeatures`] if the count is 0 or exceeds `n_features`.
    pub fn resolve(self, n_features: usize) -> Result<usize, TreeError> {
        let resolved = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::SqrtAtLeastTwo => {
                let root = (n_features as f64).sqrt().ceil() as usize;
                root.max(2).min(n_features)
            }
            MaxFeatures::Fixed(m) => m,
        };
        if resolved == 0 || resolved > n_features {
            return Err(TreeError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Configuration for an ensemble of bootstrap-trained trees.
///
/// Construct via [`EnsembleConfig::bagging`] or [`EnsembleConfig::random_forest`],
/// then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter          | `bagging` | `random_forest`   |
/// |--------------------|-----------|-------------------|
/// | `max_features`     | `All`     | `SqrtAtLeastTwo`  |
/// | `max_depth`        | 4         | 4                 |
/// | `gini_threshold`   | 0.0       | 0.0               |
/// | `min_observations` | 1         | 1                 |
/// | `n_candidates`     | 50        | 50                |
/// | `seed`             | 42        | 42                |
#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: usize,
    pub(crate) gini_threshold: f64,
    pub(crate) min_observations: usize,
    pub(crate) n_candidates: usize,
    pub(crate) seed: u64,
}

impl EnsembleConfig {
    /// Create a config with the given number of trees and feature strategy.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize, max_features: MaxFeatures) -> Result<Self, TreeError> {
        if n_trees == 0 {
            return Err(TreeError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features,
            max_depth: 4,
            gini_threshold: 0.0,
            min_observations: 1,
            n_candidates: DEFAULT_N_CANDIDATES,
            seed: 42,
        })
    }

    /// Bagging: bootstrap rows, every branch searches all features.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn bagging(n_trees: usize) -> Result<Self, TreeError> {
        Self::new(n_trees, MaxFeatures::All)
    }

    /// Random forest: bootstrap rows and draw a feature subset at every branch.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn random_forest(n_trees: usize) -> Result<Self, TreeError> {
        Self::new(n_trees, MaxFeatures::SqrtAtLeastTwo)
    }

    // --- Setters ---

    /// Set the per-branch feature strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum branch depth of each replicate tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the purity stopping threshold.
    #[must_use]
    pub fn with_gini_threshold(mut self, gini_threshold: f64) -> Self {
        self.gini_threshold = gini_threshold;
        self
    }

    /// Set the minimum child partition size.
    #[must_use]
    pub fn with_min_observations(mut self, min_observations: usize) -> Self {
        self.min_observations = min_observations;
        self
    }

    /// Set the number of grid thresholds per feature.
    #[must_use]
    pub fn with_n_candidates(mut self, n_candidates: usize) -> Self {
        self.n_candidates = n_candidates;
        self
    }

    /// Set the master random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the per-branch feature strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the maximum branch depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the purity stopping threshold.
    #[must_use]
    pub fn gini_threshold(&self) -> f64 {
        self.gini_threshold
    }

    /// Return the minimum child partition size.
    #[must_use]
    pub fn min_observations(&self) -> usize {
        self.min_observations
    }

    /// Return the number of grid thresholds per feature.
    #[must_use]
    pub fn n_candidates(&self) -> usize {
        self.n_candidates
    }

    /// Return the master random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The per-replicate tree config, before feature-count resolution.
    pub(crate) fn tree_config(&self) -> TreeConfig {
        TreeConfig::new()
            .with_max_depth(self.max_depth)
            .with_gini_threshold(self.gini_threshold)
            .with_min_observations(self.min_observations)
            .with_n_candidates(self.n_candidates)
    }

    /// Train one tree per replicate on bootstrap samples of `train`.
    ///
    /// Replicates that fail to build are recorded, not fatal.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                                     |
    /// |---------------------------------------|------------------------------------------|
    /// | [`TreeError::InvalidMaxFeatures`]     | resolved count outside [1, n_features]   |
    /// | [`TreeError::InvalidMaxDepth`]        | `max_depth` is zero                      |
    /// | [`TreeError::InvalidGiniThreshold`]   | `gini_threshold` outside [0.0, 0.5]      |
    /// | [`TreeError::InvalidMinObservations`] | `min_observations` is zero               |
    /// | [`TreeError::InvalidCandidateCount`]  | `n_candidates` is zero                   |
    pub fn fit(&self, train: &Dataset) -> Result<Ensemble, TreeError> {
        crate::ensemble::train(self, train)
    }

    /// Train on `train` and average replicate predictions over `test_rows`.
    ///
    /// # Errors
    ///
    /// Any error of [`EnsembleConfig::fit`], plus
    /// [`TreeError::PredictionFeatureMismatch`] when a test row has the wrong arity.
    pub fn fit_predict(
        &self,
        train: &Dataset,
        test_rows: &[Vec<f64>],
    ) -> Result<EnsemblePrediction, TreeError> {
        self.fit(train)?.predict_many(test_rows)
    }
}
