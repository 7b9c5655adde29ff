//! Bagging and random-forest ensembles with parallel replicate training.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{
    IndexedParallelIterator, IntoParallelIterator, IntoParallelRefIterator, ParallelIterator,
};
use tracing::{debug, info, instrument, warn};

use crate::config::{EnsembleConfig, MaxFeatures};
use crate::dataset::Dataset;
use crate::error::TreeError;
use crate::tree::BranchTable;

/// Outcome of one bootstrap replicate.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Replicate {
    /// A tree was grown on the replicate's bootstrap sample.
    Fitted(BranchTable),
    /// The replicate could not be built; it contributes nothing to predictions.
    Failed {
        /// Description of the build failure.
        reason: String,
    },
}

impl Replicate {
    /// Return the fitted tree, if the replicate succeeded.
    #[must_use]
    pub fn tree(&self) -> Option<&BranchTable> {
        match self {
            Replicate::Fitted(tree) => Some(tree),
            Replicate::Failed { .. } => None,
        }
    }
}

/// A fitted ensemble: one slot per bootstrap replicate, in replicate order.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Ensemble {
    pub(crate) replicates: Vec<Replicate>,
    pub(crate) feature_names: Vec<String>,
    pub(crate) max_features: MaxFeatures,
}

/// Averaged ensemble predictions for a batch of rows.
#[derive(Debug, Clone)]
pub struct EnsemblePrediction {
    scores: Vec<Option<f64>>,
    n_contributions: Vec<usize>,
    replicate_columns: Vec<Option<Vec<f64>>>,
}

impl EnsemblePrediction {
    /// Per-row mean of the non-missing replicate predictions.
    ///
    /// `None` marks a row no replicate contributed to.
    #[must_use]
    pub fn scores(&self) -> &[Option<f64>] {
        &self.scores
    }

    /// Per-row count of contributing replicates.
    #[must_use]
    pub fn n_contributions(&self) -> &[usize] {
        &self.n_contributions
    }

    /// Per-replicate prediction columns; `None` for a missing replicate.
    #[must_use]
    pub fn replicate_columns(&self) -> &[Option<Vec<f64>>] {
        &self.replicate_columns
    }

    /// Indices of replicates whose predictions are missing.
    #[must_use]
    pub fn failed_replicates(&self) -> Vec<usize> {
        self.replicate_columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Return the scores, failing on the first undefined row.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::UndefinedPrediction`] for the first row with no contribution.
    pub fn defined_scores(&self) -> Result<Vec<f64>, TreeError> {
        self.scores
            .iter()
            .enumerate()
            .map(|(row, s)| s.ok_or(TreeError::UndefinedPrediction { row }))
            .collect()
    }
}

/// Draw `n` row indices uniformly with replacement.
pub(crate) fn bootstrap_indices(n: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

/// Train the ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_observations = train.n_observations()))]
pub(crate) fn train(config: &EnsembleConfig, train: &Dataset) -> Result<Ensemble, TreeError> {
    let n_features = train.n_features();
    let max_features = config.max_features.resolve(n_features)?;
    let tree_config = config
        .tree_config()
        .with_max_features(Some(max_features));
    tree_config.validate(n_features)?;

    let n_observations = train.n_observations();
    info!(
        n_trees = config.n_trees,
        n_observations,
        n_features,
        max_features,
        "training ensemble"
    );

    // Replicate i's seed is the i-th draw, independent of n_trees.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let replicates: Vec<Replicate> = seeds
        .into_par_iter()
        .enumerate()
        .map(|(replicate, seed)| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let sample = train.subset(&bootstrap_indices(n_observations, &mut rng));
            match tree_config.grow(&sample, max_features, &mut rng) {
                Ok(tree) => Replicate::Fitted(tree),
                Err(e) => {
                    let failure = TreeError::ReplicateFailure {
                        replicate,
                        reason: e.to_string(),
                    };
                    warn!(error = %failure, "replicate dropped");
                    Replicate::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        })
        .collect();

    let n_failed = replicates.iter().filter(|r| r.tree().is_none()).count();
    info!(n_failed, "ensemble training complete");

    Ok(Ensemble {
        replicates,
        feature_names: train.feature_names().to_vec(),
        max_features: config.max_features,
    })
}

impl Ensemble {
    /// Average replicate predictions for each row.
    ///
    /// A replicate that failed to build, or whose prediction fails, is missing
    /// for every row and excluded from the averages.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::PredictionFeatureMismatch`] if any row has the wrong arity.
    pub fn predict_many(&self, rows: &[Vec<f64>]) -> Result<EnsemblePrediction, TreeError> {
        let n_features = self.feature_names.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != n_features) {
            return Err(TreeError::PredictionFeatureMismatch {
                expected: n_features,
                got: bad.len(),
            });
        }

        let replicate_columns: Vec<Option<Vec<f64>>> = self
            .replicates
            .par_iter()
            .enumerate()
            .map(|(replicate, r)| {
                let tree = r.tree()?;
                match tree.predict_many(rows) {
                    Ok(column) => Some(column),
                    Err(e) => {
                        warn!(replicate, error = %e, "replicate prediction dropped");
                        None
                    }
                }
            })
            .collect();

        let mut sums = vec![0.0f64; rows.len()];
        let mut n_contributions = vec![0usize; rows.len()];
        for column in replicate_columns.iter().flatten() {
            for (row, &p) in column.iter().enumerate() {
                sums[row] += p;
                n_contributions[row] += 1;
            }
        }
        let scores = sums
            .iter()
            .zip(&n_contributions)
            .map(|(&s, &n)| (n > 0).then(|| s / n as f64))
            .collect();

        debug!(n_rows = rows.len(), "ensemble prediction complete");

        Ok(EnsemblePrediction {
            scores,
            n_contributions,
            replicate_columns,
        })
    }

    /// Predict every observation of a dataset.
    ///
    /// # Errors
    ///
    /// Same as [`Ensemble::predict_many`].
    pub fn predict_dataset(&self, dataset: &Dataset) -> Result<EnsemblePrediction, TreeError> {
        self.predict_many(&dataset.rows())
    }

    /// Return the replicate slots in replicate order.
    #[must_use]
    pub fn replicates(&self) -> &[Replicate] {
        &self.replicates
    }

    /// Return the number of replicates, fitted or failed.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.replicates.len()
    }

    /// Return the number of replicates that failed to build.
    #[must_use]
    pub fn n_failed(&self) -> usize {
        self.replicates.iter().filter(|r| r.tree().is_none()).count()
    }

    /// Return the feature names of the training schema.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the per-branch feature strategy used at training time.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }
}

/// Bagging: fit `n_trees` full-feature trees on bootstrap samples of `train`
/// and average their predictions over `test_rows`.
///
/// # Errors
///
/// Configuration errors of [`EnsembleConfig`] and arity errors of [`Ensemble::predict_many`].
pub fn bag(
    train: &Dataset,
    test_rows: &[Vec<f64>],
    n_trees: usize,
    max_depth: usize,
    gini_threshold: f64,
    min_observations: usize,
) -> Result<EnsemblePrediction, TreeError> {
    EnsembleConfig::bagging(n_trees)?
        .with_max_depth(max_depth)
        .with_gini_threshold(gini_threshold)
        .with_min_observations(min_observations)
        .fit_predict(train, test_rows)
}

/// Random forest: as [`bag`], but each branch searches `m_features` randomly
/// drawn features (`None` = `max(2, ceil(sqrt(n_features)))`).
///
/// # Errors
///
/// Configuration errors of [`EnsembleConfig`] and arity errors of [`Ensemble::predict_many`].
pub fn random_forest(
    train: &Dataset,
    test_rows: &[Vec<f64>],
    n_trees: usize,
    max_depth: usize,
    gini_threshold: f64,
    min_observations: usize,
    m_features: Option<usize>,
) -> Result<EnsemblePrediction, TreeError> {
    let max_features = m_features.map_or(MaxFeatures::SqrtAtLeastTwo, MaxFeatures::Fixed);
    EnsembleConfig::random_forest(n_trees)?
        .with_max_features(max_features)
        .with_max_depth(max_depth)
        .with_gini_threshold(gini_threshold)
        .with_min_observations(min_observations)
        .fit_predict(train, test_rows)
}
