//! CSV reader for labelled feature tables with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::LabelledTable;

/// Reads a labelled feature table from a CSV file.
///
/// Expected CSV format:
/// - Header row required; one column is the label, named at construction
/// - Every other column is a numeric feature, kept in file order
/// - Labels must be `0` or `1` (`0.0` and `1.0` are accepted)
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingLabelColumn`] | Header lacks the label column |
/// | [`IoError::NoFeatureColumns`] | Header has no column besides the label |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Feature cell is NaN, Inf, or unparseable float |
/// | [`IoError::InvalidLabel`] | Label cell is not 0 or 1 |
pub struct LabelledCsvReader {
    path: PathBuf,
    label_column: String,
}

impl LabelledCsvReader {
    /// Create a new reader for the given CSV file path and label column name.
    pub fn new(path: &Path, label_column: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            label_column: label_column.to_string(),
        }
    }

    /// Read and validate the CSV file, returning a [`LabelledTable`].
    #[instrument(skip(self), fields(path = %self.path.display(), label = %self.label_column))]
    pub fn read(&self) -> Result<LabelledTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets InconsistentRowLength fire instead of a bare CsvParse.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.parse_error(e))?.clone();
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");

        let label_index = header
            .iter()
            .position(|h| h == self.label_column)
            .ok_or_else(|| IoError::MissingLabelColumn {
                path: self.path.clone(),
                column: self.label_column.clone(),
            })?;
        if expected_cols < 2 {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }

        let feature_names: Vec<String> = header
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != label_index)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut rows = Vec::new();
        let mut labels = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.parse_error(e))?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let mut row = Vec::with_capacity(feature_names.len());
            for (col_index, raw) in record.iter().enumerate() {
                if col_index == label_index {
                    labels.push(self.parse_label(row_index, raw)?);
                    continue;
                }
                row.push(self.parse_feature(row_index, &header[col_index], raw)?);
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let n_positive = labels.iter().filter(|&&l| l == 1.0).count();
        info!(
            n_rows = rows.len(),
            n_features = feature_names.len(),
            n_positive,
            "labelled table loaded"
        );

        Ok(LabelledTable::new(
            self.label_column.clone(),
            feature_names,
            rows,
            labels,
        ))
    }

    fn parse_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn parse_feature(&self, row_index: usize, column: &str, raw: &str) -> Result<f64, IoError> {
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(IoError::NonFiniteValue {
                path: self.path.clone(),
                row_index,
                column: column.to_string(),
                raw: raw.to_string(),
            }),
        }
    }

    fn parse_label(&self, row_index: usize, raw: &str) -> Result<f64, IoError> {
        match raw.parse::<f64>() {
            Ok(value) if value == 0.0 || value == 1.0 => Ok(value),
            _ => Err(IoError::InvalidLabel {
                path: self.path.clone(),
                row_index,
                raw: raw.to_string(),
            }),
        }
    }
}
