//! Binary classification trees: grow, ensemble, evaluate, persist.
//!
//! Provides a Gini decision tree whose splits are found on an evenly spaced
//! threshold grid, stored as a flat table of branches keyed by their path
//! from the root, plus bagging and random-forest ensembles trained in
//! parallel via rayon.

mod branch;
mod config;
mod confusion;
mod dataset;
mod ensemble;
mod error;
mod impurity;
mod predict;
mod serialize;
mod split;
pub mod synthetic;
mod tree;

pub use branch::{Branch, BranchId, Direction, FeatureIndex, Impurity};
pub use config::{EnsembleConfig, MaxFeatures};
pub use confusion::{ClassMetrics, ConfusionMatrix, DEFAULT_CUTOFF, accuracy};
pub use dataset::Dataset;
pub use ensemble::{Ensemble, EnsemblePrediction, Replicate, bag, random_forest};
pub use error::TreeError;
pub use impurity::{gini, gini_of_labels, mean_label, weighted_gini};
pub use serialize::SavedModel;
pub use split::{
    BestSplit, DEFAULT_N_CANDIDATES, FeatureSplit, best_feature_and_split,
    optimal_split_for_feature, threshold_grid,
};
pub use tree::{BranchTable, StopReason, TreeConfig};
