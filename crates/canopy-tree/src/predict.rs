//! Prediction by walking a branch table.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::dataset::Dataset;
use crate::error::TreeError;
use crate::tree::BranchTable;

impl BranchTable {
    /// Predict the positive-class probability for a single observation.
    ///
    /// Starts at the root. At each branch the observation goes left when
    /// `observation[feature] <= threshold` and right otherwise; if the child
    /// on that side was recorded the walk descends, otherwise the branch's
    /// stored prediction for that side is returned.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::EmptyTree`] | the table holds no branches |
    /// | [`TreeError::PredictionFeatureMismatch`] | `observation.len() != n_features` |
    pub fn predict_one(&self, observation: &[f64]) -> Result<f64, TreeError> {
        if observation.len() != self.n_features() {
            return Err(TreeError::PredictionFeatureMismatch {
                expected: self.n_features(),
                got: observation.len(),
            });
        }
        let mut branch = self.root().ok_or(TreeError::EmptyTree)?;
        loop {
            let direction = branch.route(observation);
            let child = branch.id.child(direction);
            match self.get(&child) {
                Some(next) => branch = next,
                None => return Ok(branch.leaf_prediction(direction)),
            }
        }
    }

    /// Predict a batch of row-major observations in parallel, preserving input order.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`BranchTable::predict_one`].
    pub fn predict_many(&self, observations: &[Vec<f64>]) -> Result<Vec<f64>, TreeError> {
        observations
            .into_par_iter()
            .map(|obs| self.predict_one(obs))
            .collect()
    }

    /// Predict every observation of a dataset.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`BranchTable::predict_one`].
    pub fn predict_dataset(&self, dataset: &Dataset) -> Result<Vec<f64>, TreeError> {
        self.predict_many(&dataset.rows())
    }
}
