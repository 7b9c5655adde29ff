//! Model persistence via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::ensemble::Ensemble;
use crate::error::TreeError;
use crate::tree::BranchTable;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// A fitted model of either kind, as stored on disk.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum SavedModel {
    /// A single decision tree.
    Tree(BranchTable),
    /// A bagged or random-forest ensemble.
    Ensemble(Ensemble),
}

impl SavedModel {
    /// Name of the model kind, as reported in [`TreeError::WrongModelKind`].
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SavedModel::Tree(_) => "tree",
            SavedModel::Ensemble(_) => "ensemble",
        }
    }

    /// Feature names of the training schema.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        match self {
            SavedModel::Tree(t) => t.feature_names(),
            SavedModel::Ensemble(e) => e.feature_names(),
        }
    }

    /// Save the model to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::SerializeModel`] | bincode encoding failed |
    /// | [`TreeError::WriteModel`] | file write failed |
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TreeError> {
        let model = match self {
            SavedModel::Tree(tree) => ModelRef::Tree(tree),
            SavedModel::Ensemble(ensemble) => ModelRef::Ensemble(ensemble),
        };
        write_envelope(path.as_ref(), model)
    }

    /// Load a model of either kind from a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::ReadModel`] | file read failed |
    /// | [`TreeError::DeserializeModel`] | bincode decoding failed |
    /// | [`TreeError::IncompatibleModelVersion`] | format version mismatch |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TreeError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| TreeError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|e| TreeError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(TreeError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        debug!(
            kind = envelope.model.kind(),
            n_features = envelope.feature_names.len(),
            "model loaded"
        );
        Ok(envelope.model)
    }
}

/// Versioned envelope for the serialized model.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Feature column names the model was trained on.
    feature_names: Vec<String>,
    model: SavedModel,
}

/// Borrowed view of [`SavedModel`]. Encodes to the same bytes, so files
/// written through it load back as a [`SavedModel`].
#[derive(Clone, Copy, serde::Serialize)]
enum ModelRef<'a> {
    Tree(&'a BranchTable),
    Ensemble(&'a Ensemble),
}

impl<'a> ModelRef<'a> {
    fn kind(&self) -> &'static str {
        match self {
            ModelRef::Tree(_) => "tree",
            ModelRef::Ensemble(_) => "ensemble",
        }
    }

    fn feature_names(&self) -> &'a [String] {
        match *self {
            ModelRef::Tree(t) => t.feature_names(),
            ModelRef::Ensemble(e) => e.feature_names(),
        }
    }
}

/// Write-side twin of [`ModelEnvelope`] that borrows the model.
#[derive(serde::Serialize)]
struct EnvelopeRef<'a> {
    format_version: u32,
    feature_names: &'a [String],
    model: ModelRef<'a>,
}

#[instrument(skip(model), fields(path = %path.display(), kind = model.kind()))]
fn write_envelope(path: &Path, model: ModelRef<'_>) -> Result<(), TreeError> {
    let envelope = EnvelopeRef {
        format_version: FORMAT_VERSION,
        feature_names: model.feature_names(),
        model,
    };

    let bytes =
        bincode::serialize(&envelope).map_err(|e| TreeError::SerializeModel { source: e })?;

    std::fs::write(path, &bytes).map_err(|e| TreeError::WriteModel {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!(size_bytes = bytes.len(), "model saved");
    Ok(())
}

impl BranchTable {
    /// Save the tree to a binary file.
    ///
    /// # Errors
    ///
    /// Same as [`SavedModel::save`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TreeError> {
        write_envelope(path.as_ref(), ModelRef::Tree(self))
    }

    /// Load a tree from a binary file.
    ///
    /// # Errors
    ///
    /// Any error of [`SavedModel::load`], plus [`TreeError::WrongModelKind`]
    /// when the file holds an ensemble.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TreeError> {
        let path = path.as_ref();
        match SavedModel::load(path)? {
            SavedModel::Tree(tree) => Ok(tree),
            other => Err(TreeError::WrongModelKind {
                expected: "tree",
                found: other.kind().to_string(),
                path: path.to_path_buf(),
            }),
        }
    }
}

impl Ensemble {
    /// Save the ensemble to a binary file.
    ///
    /// # Errors
    ///
    /// Same as [`SavedModel::save`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TreeError> {
        write_envelope(path.as_ref(), ModelRef::Ensemble(self))
    }

    /// Load an ensemble from a binary file.
    ///
    /// # Errors
    ///
    /// Any error of [`SavedModel::load`], plus [`TreeError::WrongModelKind`]
    /// when the file holds a single tree.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TreeError> {
        let path = path.as_ref();
        match SavedModel::load(path)? {
            SavedModel::Ensemble(ensemble) => Ok(ensemble),
            other => Err(TreeError::WrongModelKind {
                expected: "ensemble",
                found: other.kind().to_string(),
                path: path.to_path_buf(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::EnsembleConfig;
    use crate::synthetic;
    use crate::tree::TreeConfig;

    #[test]
    fn tree_round_trip_identical_predictions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tree.model");
        let data = synthetic::checkerboard(300, 11);
        let tree = TreeConfig::new().fit(&data).unwrap();

        tree.save(&path).unwrap();
        let loaded = BranchTable::load(&path).unwrap();

        assert_eq!(loaded.len(), tree.len());
        assert_eq!(
            tree.predict_dataset(&data).unwrap(),
            loaded.predict_dataset(&data).unwrap()
        );
    }

    #[test]
    fn ensemble_round_trip_identical_predictions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forest.model");
        let data = synthetic::angled(200, 12);
        let ensemble = EnsembleConfig::random_forest(6).unwrap().fit(&data).unwrap();

        ensemble.save(&path).unwrap();
        let loaded = Ensemble::load(&path).unwrap();

        assert_eq!(loaded.n_trees(), 6);
        assert_eq!(
            ensemble.predict_dataset(&data).unwrap().scores(),
            loaded.predict_dataset(&data).unwrap().scores()
        );
    }

    #[test]
    fn loading_wrong_kind_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tree.model");
        let data = synthetic::checkerboard(100, 13);
        TreeConfig::new().fit(&data).unwrap().save(&path).unwrap();

        let err = Ensemble::load(&path).unwrap_err();
        assert!(matches!(err, TreeError::WrongModelKind { expected: "ensemble", .. }));
        assert_eq!(SavedModel::load(&path).unwrap().kind(), "tree");
    }

    #[test]
    fn load_nonexistent_file_error() {
        let dir = TempDir::new().unwrap();
        let err = BranchTable::load(dir.path().join("missing.model")).unwrap_err();
        assert!(matches!(err, TreeError::ReadModel { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.model");
        std::fs::write(&path, b"not a valid bincode file").unwrap();
        let err = SavedModel::load(&path).unwrap_err();
        assert!(matches!(err, TreeError::DeserializeModel { .. }));
    }

    #[test]
    fn borrowed_envelope_encodes_like_owned() {
        let data = synthetic::checkerboard(80, 15);
        let ensemble = EnsembleConfig::bagging(3).unwrap().fit(&data).unwrap();

        let owned = ModelEnvelope {
            format_version: FORMAT_VERSION,
            feature_names: ensemble.feature_names().to_vec(),
            model: SavedModel::Ensemble(ensemble.clone()),
        };
        let model = ModelRef::Ensemble(&ensemble);
        let borrowed = EnvelopeRef {
            format_version: FORMAT_VERSION,
            feature_names: model.feature_names(),
            model,
        };
        assert_eq!(
            bincode::serialize(&borrowed).unwrap(),
            bincode::serialize(&owned).unwrap()
        );

        let dir = TempDir::new().unwrap();
        let via_ensemble = dir.path().join("a.model");
        let via_saved = dir.path().join("b.model");
        ensemble.save(&via_ensemble).unwrap();
        owned.model.save(&via_saved).unwrap();
        assert_eq!(
            std::fs::read(&via_ensemble).unwrap(),
            std::fs::read(&via_saved).unwrap()
        );
    }

    #[test]
    fn future_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.model");
        let data = synthetic::checkerboard(60, 14);
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION + 1,
            feature_names: data.feature_names().to_vec(),
            model: SavedModel::Tree(TreeConfig::new().fit(&data).unwrap()),
        };
        std::fs::write(&path, bincode::serialize(&envelope).unwrap()).unwrap();
        let err = SavedModel::load(&path).unwrap_err();
        assert!(matches!(
            err,
            TreeError::IncompatibleModelVersion { expected: 1, found: 2, .. }
        ));
    }
}
