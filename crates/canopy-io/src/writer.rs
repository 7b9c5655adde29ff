//! CSV table writer and JSON result writer for fit and predict outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{ExperimentName, LabelledTable};

/// Write a labelled table as CSV: feature columns in order, label column last.
///
/// # Errors
///
/// Returns [`IoError::WriteCsv`] if the file cannot be created or a record
/// cannot be written.
#[instrument(skip_all, fields(path = %path.display(), n_rows = table.n_rows()))]
pub fn write_table(path: &Path, table: &LabelledTable) -> Result<(), IoError> {
    let csv_error = |e: csv::Error| IoError::WriteCsv {
        path: path.to_path_buf(),
        source: e,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_error)?;

    let mut header: Vec<&str> = table.feature_names().iter().map(String::as_str).collect();
    header.push(table.label_column());
    wtr.write_record(&header).map_err(csv_error)?;

    for (row, &label) in table.rows().iter().zip(table.labels()) {
        let mut record: Vec<String> = row.iter().map(f64::to_string).collect();
        record.push(format!("{label}"));
        wtr.write_record(&record).map_err(csv_error)?;
    }
    wtr.flush().map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!("table written");
    Ok(())
}

/// Summary of a fitted model's held-out performance.
///
/// A plain record so the writer has no dependency on `canopy-tree`.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    /// Model kind: `tree`, `bag`, or `forest`.
    pub method: String,
    /// Number of training rows.
    pub n_train: usize,
    /// Number of test rows.
    pub n_test: usize,
    /// Number of ensemble replicates (1 for a single tree).
    pub n_trees: usize,
    /// Replicates that failed to build.
    pub n_failed_replicates: usize,
    /// Test rows with no defined score.
    pub n_undefined: usize,
    /// Score cutoff separating class 0 from class 1.
    pub cutoff: f64,
    /// Accuracy over the test rows with a defined score.
    pub test_accuracy: f64,
    /// `confusion_matrix[true][predicted]`.
    pub confusion_matrix: [[usize; 2]; 2],
    /// `(precision, recall, f1, support)` for class 0 then class 1.
    #[serde(skip)]
    pub class_metrics: Vec<(f64, f64, f64, usize)>,
}

/// Writes fit and predict results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_evaluate.json` and
/// `{experiment}_predictions.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write an evaluation report to `{experiment}_evaluate.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_evaluation(&self, report: &EvaluationReport) -> Result<PathBuf, IoError> {
        let path = self.artifact_path("evaluate.json");

        let class_metrics: Vec<ClassEntry> = report
            .class_metrics
            .iter()
            .enumerate()
            .map(|(class, &(precision, recall, f1, support))| ClassEntry {
                class,
                precision,
                recall,
                f1,
                support,
            })
            .collect();

        let artifact = EvaluateArtifact {
            experiment: self.experiment.as_str(),
            report,
            class_metrics,
        };
        self.write_json(&path, &artifact)?;

        info!(path = %path.display(), "evaluation result written");
        Ok(path)
    }

    /// Write per-row scores to `{experiment}_predictions.json`.
    ///
    /// A `None` score is written as `null` with no predicted class. `labels`
    /// may be empty when the true classes are unknown.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n_rows = scores.len()))]
    pub fn write_predictions(
        &self,
        scores: &[Option<f64>],
        labels: &[f64],
        cutoff: f64,
    ) -> Result<PathBuf, IoError> {
        let path = self.artifact_path("predictions.json");

        let predictions: Vec<PredictionEntry> = scores
            .iter()
            .enumerate()
            .map(|(row, &score)| PredictionEntry {
                row,
                score,
                predicted_class: score.map(|s| u8::from(s >= cutoff)),
                label: labels.get(row).copied(),
            })
            .collect();

        let artifact = PredictArtifact {
            experiment: self.experiment.as_str(),
            n_rows: scores.len(),
            n_undefined: scores.iter().filter(|s| s.is_none()).count(),
            cutoff,
            predictions,
        };
        self.write_json(&path, &artifact)?;

        info!(path = %path.display(), "predictions written");
        Ok(path)
    }

    /// Return the path where the model binary should be saved.
    ///
    /// Does not write anything; just computes `{output_dir}/{experiment}.model`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.model", self.experiment.as_str()))
    }

    fn artifact_path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}", self.experiment.as_str()))
    }

    fn write_json(&self, path: &Path, artifact: &impl Serialize) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact).expect("serialization cannot fail");
        fs::write(path, &json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct EvaluateArtifact<'a> {
    experiment: &'a str,
    #[serde(flatten)]
    report: &'a EvaluationReport,
    class_metrics: Vec<ClassEntry>,
}

#[derive(Serialize)]
struct ClassEntry {
    class: usize,
    precision: f64,
    recall: f64,
    f1: f64,
    support: usize,
}

#[derive(Serialize)]
struct PredictArtifact<'a> {
    experiment: &'a str,
    n_rows: usize,
    n_undefined: usize,
    cutoff: f64,
    predictions: Vec<PredictionEntry>,
}

#[derive(Serialize)]
struct PredictionEntry {
    row: usize,
    score: Option<f64>,
    predicted_class: Option<u8>,
    label: Option<f64>,
}
