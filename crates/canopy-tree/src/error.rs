use std::path::PathBuf;

/// Errors from tree building, prediction, and ensemble operations.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_observations is zero.
    #[error("min_observations must be at least 1, got {min_observations}")]
    InvalidMinObservations {
        /// The invalid min_observations value provided.
        min_observations: usize,
    },

    /// Returned when gini_threshold is outside [0.0, 0.5].
    #[error("gini_threshold must be in [0.0, 0.5], got {gini_threshold}")]
    InvalidGiniThreshold {
        /// The invalid gini_threshold value provided.
        gini_threshold: f64,
    },

    /// Returned when the threshold grid would have zero candidates.
    #[error("n_candidates must be at least 1, got {n_candidates}")]
    InvalidCandidateCount {
        /// The invalid n_candidates value provided.
        n_candidates: usize,
    },

    /// Returned when the held-out fraction is not a finite value strictly between 0 and 1.
    #[error("test_fraction must be in (0.0, 1.0), got {test_fraction}")]
    InvalidTestFraction {
        /// The invalid test_fraction value provided.
        test_fraction: f64,
    },

    /// Returned when the per-node feature count resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when the dataset has zero observations.
    #[error("dataset has zero observations")]
    EmptyDataset,

    /// Returned when the dataset has zero feature columns.
    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a feature name is empty or declared twice.
    #[error("feature name \"{name}\" is empty or duplicated")]
    DuplicateFeatureName {
        /// The offending feature name.
        name: String,
    },

    /// Returned when a row has a different number of values than the schema.
    #[error("row {row} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of values in the row.
        got: usize,
        /// The zero-based index of the offending row.
        row: usize,
    },

    /// Returned when the label vector and the feature rows differ in length.
    #[error("got {labels} labels for {rows} rows")]
    LabelCountMismatch {
        /// Number of feature rows (or values).
        rows: usize,
        /// Number of labels.
        labels: usize,
    },

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite value at row {row}, feature {feature}")]
    NonFiniteValue {
        /// The zero-based row index.
        row: usize,
        /// The zero-based feature column index.
        feature: usize,
    },

    /// Returned when a label is not 0 or 1.
    #[error("label at row {row} is {value}, expected 0 or 1")]
    InvalidLabel {
        /// The zero-based row index.
        row: usize,
        /// The offending label value.
        value: f64,
    },

    /// Returned when no candidate split yields a defined impurity.
    #[error("no feature yields a defined split impurity over {n_observations} observations")]
    DegenerateSplit {
        /// Number of observations in the partition that could not be split.
        n_observations: usize,
    },

    /// Returned when a candidate threshold leaves one side empty.
    #[error("threshold {threshold} leaves an empty partition")]
    EmptyPartition {
        /// The candidate threshold.
        threshold: f64,
    },

    /// Returned when an ensemble replicate could not be built or evaluated.
    #[error("replicate {replicate} failed: {reason}")]
    ReplicateFailure {
        /// Zero-based replicate index.
        replicate: usize,
        /// Human-readable description of the underlying failure.
        reason: String,
    },

    /// Returned when predicting with a tree that holds no branches.
    #[error("branch table is empty")]
    EmptyTree,

    /// Returned when a prediction input has the wrong number of features.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a row received no contribution from any replicate.
    #[error("row {row} has no defined prediction (every replicate failed)")]
    UndefinedPrediction {
        /// The zero-based row index.
        row: usize,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },

    /// Returned when a model file holds a different kind of model than requested.
    #[error("model in {path} is a {found}, expected a {expected}")]
    WrongModelKind {
        /// The kind of model requested.
        expected: &'static str,
        /// The kind of model found in the file.
        found: String,
        /// Path to the model file.
        path: PathBuf,
    },
}
