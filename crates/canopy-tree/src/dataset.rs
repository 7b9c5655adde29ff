//! Fixed-schema binary-labelled dataset.

use std::collections::HashSet;

use rand::Rng;

use crate::error::TreeError;

/// A validated dataset of named numeric feature columns and 0/1 labels.
///
/// The schema (ordered feature names) is fixed at construction. Values are
/// stored column-major: `columns[feature][row]`. A dataset is never mutated;
/// [`Dataset::subset`] produces a new one.
#[derive(Debug, Clone)]
pub struct Dataset {
    feature_names: Vec<String>,
    columns: Vec<Vec<f64>>,
    labels: Vec<f64>,
}

impl Dataset {
    /// Build a dataset from row-major feature values.
    ///
    /// `rows[row][feature]`, `labels[row]` in {0.0, 1.0}.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                                  |
    /// |---------------------------------------|---------------------------------------|
    /// | [`TreeError::EmptyDataset`]           | `rows` is empty                       |
    /// | [`TreeError::ZeroFeatures`]           | `feature_names` is empty              |
    /// | [`TreeError::DuplicateFeatureName`]   | a name is empty or repeated           |
    /// | [`TreeError::LabelCountMismatch`]     | `labels.len() != rows.len()`          |
    /// | [`TreeError::FeatureCountMismatch`]   | a row's length differs from the schema|
    /// | [`TreeError::NonFiniteValue`]         | a value is NaN or infinite            |
    /// | [`TreeError::InvalidLabel`]           | a label is not 0 or 1                 |
    pub fn from_rows(
        feature_names: Vec<String>,
        rows: &[Vec<f64>],
        labels: &[f64],
    ) -> Result<Self, TreeError> {
        if rows.is_empty() {
            return Err(TreeError::EmptyDataset);
        }
        if feature_names.is_empty() {
            return Err(TreeError::ZeroFeatures);
        }
        let mut seen = HashSet::with_capacity(feature_names.len());
        for name in &feature_names {
            if name.is_empty() || !seen.insert(name.as_str()) {
                return Err(TreeError::DuplicateFeatureName { name: name.clone() });
            }
        }
        if labels.len() != rows.len() {
            return Err(TreeError::LabelCountMismatch {
                rows: rows.len(),
                labels: labels.len(),
            });
        }

        let n_features = feature_names.len();
        let mut columns = vec![Vec::with_capacity(rows.len()); n_features];
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n_features {
                return Err(TreeError::FeatureCountMismatch {
                    expected: n_features,
                    got: values.len(),
                    row,
                });
            }
            for (feature, &value) in values.iter().enumerate() {
                if !value.is_finite() {
                    return Err(TreeError::NonFiniteValue { row, feature });
                }
                columns[feature].push(value);
            }
        }
        for (row, &value) in labels.iter().enumerate() {
            if value != 0.0 && value != 1.0 {
                return Err(TreeError::InvalidLabel { row, value });
            }
        }

        Ok(Self {
            feature_names,
            columns,
            labels: labels.to_vec(),
        })
    }

    /// Build a dataset with generated feature names `X1..Xn`.
    ///
    /// # Errors
    ///
    /// Same as [`Dataset::from_rows`].
    pub fn from_unnamed_rows(rows: &[Vec<f64>], labels: &[f64]) -> Result<Self, TreeError> {
        let n_features = rows.first().map_or(0, Vec::len);
        let names = (1..=n_features).map(|i| format!("X{i}")).collect();
        Self::from_rows(names, rows, labels)
    }

    /// Return a new dataset holding the given rows, in the given order.
    ///
    /// Indices may repeat (bootstrap resampling). Every index must be in range.
    #[must_use]
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| indices.iter().map(|&i| col[i]).collect())
                .collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Randomly assign each row to the test set with probability `test_fraction`.
    ///
    /// Returns `(train, test)`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::InvalidTestFraction`] | `test_fraction` is NaN or outside `(0, 1)` |
    /// | [`TreeError::EmptyDataset`] | either partition is empty |
    pub fn train_test_split(
        &self,
        test_fraction: f64,
        rng: &mut impl Rng,
    ) -> Result<(Self, Self), TreeError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(TreeError::InvalidTestFraction { test_fraction });
        }

        let mut train = Vec::new();
        let mut test = Vec::new();
        for row in 0..self.n_observations() {
            if rng.gen_bool(test_fraction) {
                test.push(row);
            } else {
                train.push(row);
            }
        }
        if train.is_empty() || test.is_empty() {
            return Err(TreeError::EmptyDataset);
        }
        Ok((self.subset(&train), self.subset(&test)))
    }

    /// Return the number of observations.
    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.labels.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// Return the ordered feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the position of a named feature.
    #[must_use]
    pub fn feature_position(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }

    /// Return one feature column.
    #[must_use]
    pub fn column(&self, feature: usize) -> &[f64] {
        &self.columns[feature]
    }

    /// Return the labels.
    #[must_use]
    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// Return one observation's feature values in schema order.
    #[must_use]
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.columns.iter().map(|col| col[row]).collect()
    }

    /// Return all observations in row-major layout.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<f64>> {
        (0..self.n_observations()).map(|r| self.row(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn builds_column_major() {
        let ds = Dataset::from_rows(
            names(&["a", "b"]),
            &[vec![1.0, 2.0], vec![3.0, 4.0]],
            &[0.0, 1.0],
        )
        .unwrap();
        assert_eq!(ds.n_observations(), 2);
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.column(1), &[2.0, 4.0]);
        assert_eq!(ds.row(1), vec![3.0, 4.0]);
        assert_eq!(ds.feature_position("b"), Some(1));
    }

    #[test]
    fn empty_dataset_error() {
        let err = Dataset::from_rows(names(&["a"]), &[], &[]).unwrap_err();
        assert!(matches!(err, TreeError::EmptyDataset));
    }

    #[test]
    fn zero_features_error() {
        let err = Dataset::from_rows(vec![], &[vec![]], &[0.0]).unwrap_err();
        assert!(matches!(err, TreeError::ZeroFeatures));
    }

    #[test]
    fn duplicate_feature_name_error() {
        let err =
            Dataset::from_rows(names(&["a", "a"]), &[vec![1.0, 2.0]], &[0.0]).unwrap_err();
        assert!(matches!(err, TreeError::DuplicateFeatureName { .. }));
    }

    #[test]
    fn label_count_mismatch_error() {
        let err = Dataset::from_rows(names(&["a"]), &[vec![1.0]], &[0.0, 1.0]).unwrap_err();
        assert!(matches!(
            err,
            TreeError::LabelCountMismatch { rows: 1, labels: 2 }
        ));
    }

    #[test]
    fn row_arity_error() {
        let err = Dataset::from_rows(names(&["a", "b"]), &[vec![1.0, 2.0], vec![3.0]], &[0.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, TreeError::FeatureCountMismatch { row: 1, .. }));
    }

    #[test]
    fn non_finite_value_error() {
        let err = Dataset::from_rows(names(&["a"]), &[vec![f64::INFINITY]], &[0.0]).unwrap_err();
        assert!(matches!(err, TreeError::NonFiniteValue { row: 0, feature: 0 }));
    }

    #[test]
    fn non_binary_label_error() {
        let err = Dataset::from_rows(names(&["a"]), &[vec![1.0]], &[2.0]).unwrap_err();
        assert!(matches!(err, TreeError::InvalidLabel { row: 0, .. }));
    }

    #[test]
    fn subset_repeats_rows_without_touching_original() {
        let ds = Dataset::from_unnamed_rows(&[vec![1.0], vec![2.0], vec![3.0]], &[0.0, 1.0, 0.0])
            .unwrap();
        let sub = ds.subset(&[2, 2, 0]);
        assert_eq!(sub.column(0), &[3.0, 3.0, 1.0]);
        assert_eq!(sub.labels(), &[0.0, 0.0, 0.0]);
        assert_eq!(ds.column(0), &[1.0, 2.0, 3.0]);
        assert_eq!(sub.feature_names(), &["X1".to_string()]);
    }

    #[test]
    fn train_test_split_partitions_all_rows() {
        let rows: Vec<Vec<f64>> = (0..100).map(|i| vec![i as f64]).collect();
        let labels: Vec<f64> = (0..100).map(|i| (i % 2) as f64).collect();
        let ds = Dataset::from_unnamed_rows(&rows, &labels).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let (train, test) = ds.train_test_split(0.3, &mut rng).unwrap();
        assert_eq!(train.n_observations() + test.n_observations(), 100);
        assert!(test.n_observations() > 10 && test.n_observations() < 50);
    }

    #[test]
    fn train_test_split_rejects_bad_fraction() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let labels: Vec<f64> = (0..20).map(|i| (i % 2) as f64).collect();
        let ds = Dataset::from_unnamed_rows(&rows, &labels).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for fraction in [f64::NAN, f64::INFINITY, -0.2, 0.0, 1.0, 1.5] {
            let err = ds.train_test_split(fraction, &mut rng).unwrap_err();
            assert!(
                matches!(err, TreeError::InvalidTestFraction { .. }),
                "fraction {fraction} gave {err:?}"
            );
        }
    }
}
