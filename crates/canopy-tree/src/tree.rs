use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument, trace};

use crate::{
    TreeError,
    branch::{Branch, BranchId, Direction},
    dataset::Dataset,
    split::{DEFAULT_N_CANDIDATES, FeatureSplit, best_feature_and_split},
};

/// Configuration for a single Gini decision tree.
///
/// Construct via [`TreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter          | Default               |
/// |--------------------|-----------------------|
/// | `max_depth`        | 4                     |
/// | `gini_threshold`   | 0.0                   |
/// | `min_observations` | 1                     |
/// | `n_candidates`     | 50                    |
/// | `max_features`     | `None` (all features) |
/// | `seed`             | 42                    |
#[derive(Debug, Clone)]
pub struct TreeConfig {
    pub(crate) max_depth: usize,
    pub(crate) gini_threshold: f64,
    pub(crate) min_observations: usize,
    pub(crate) n_candidates: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

/// Why a branch did not grow children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The branch sits at `max_depth`.
    DepthLimit,
    /// The split impurity is at or below `gini_threshold`.
    Pure,
    /// A child partition holds fewer than `min_observations` observations.
    InsufficientData,
}

impl TreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: 4,
            gini_threshold: 0.0,
            min_observations: 1,
            n_candidates: DEFAULT_N_CANDIDATES,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the maximum branch depth. The root has depth 1.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the split impurity at or below which a branch stops growing.
    #[must_use]
    pub fn with_gini_threshold(mut self, gini_threshold: f64) -> Self {
        self.gini_threshold = gini_threshold;
        self
    }

    /// Set the minimum child partition size required to keep growing.
    #[must_use]
    pub fn with_min_observations(mut self, min_observations: usize) -> Self {
        self.min_observations = min_observations;
        self
    }

    /// Set the number of grid thresholds tried per feature.
    #[must_use]
    pub fn with_n_candidates(mut self, n_candidates: usize) -> Self {
        self.n_candidates = n_candidates;
        self
    }

    /// Set the number of features drawn at each branch.
    ///
    /// `None` means every branch searches all features.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed for per-branch feature sampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

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

    /// Return the per-branch feature count, if set.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check the hyperparameters against a schema of `n_features` columns.
    ///
    /// Returns the resolved per-branch feature count.
    pub(crate) fn validate(&self, n_features: usize) -> Result<usize, TreeError> {
        if self.max_depth == 0 {
            return Err(TreeError::InvalidMaxDepth { max_depth: 0 });
        }
        if !(0.0..=0.5).contains(&self.gini_threshold) {
            return Err(TreeError::InvalidGiniThreshold {
                gini_threshold: self.gini_threshold,
            });
        }
        if self.min_observations == 0 {
            return Err(TreeError::InvalidMinObservations { min_observations: 0 });
        }
        if self.n_candidates == 0 {
            return Err(TreeError::InvalidCandidateCount { n_candidates: 0 });
        }
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(TreeError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }
        Ok(max_features)
    }

    /// Grow a tree on `dataset`.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                                     |
    /// |---------------------------------------|------------------------------------------|
    /// | [`TreeError::InvalidMaxDepth`]        | `max_depth` is zero                      |
    /// | [`TreeError::InvalidGiniThreshold`]   | `gini_threshold` outside [0.0, 0.5]      |
    /// | [`TreeError::InvalidMinObservations`] | `min_observations` is zero               |
    /// | [`TreeError::InvalidCandidateCount`]  | `n_candidates` is zero                   |
    /// | [`TreeError::InvalidMaxFeatures`]     | `max_features` outside [1, n_features]   |
    /// | [`TreeError::DegenerateSplit`]        | the root partition admits no split       |
    #[instrument(skip_all, fields(n_observations = dataset.n_observations(), max_depth = self.max_depth))]
    pub fn fit(&self, dataset: &Dataset) -> Result<BranchTable, TreeError> {
        let max_features = self.validate(dataset.n_features())?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let table = self.grow(dataset, max_features, &mut rng)?;

        debug!(
            n_branches = table.len(),
            depth = table.depth(),
            "decision tree built"
        );
        Ok(table)
    }

    /// Grow a tree with an already-validated config and a caller-owned RNG.
    pub(crate) fn grow(
        &self,
        dataset: &Dataset,
        max_features: usize,
        rng: &mut impl Rng,
    ) -> Result<BranchTable, TreeError> {
        let rows: Vec<usize> = (0..dataset.n_observations()).collect();
        let mut table = BranchTable::new(dataset.feature_names().to_vec());
        let grower = Grower {
            dataset,
            config: self,
            max_features,
        };
        grower.grow_branch(&rows, BranchId::root(), rng, &mut table)?;
        Ok(table)
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw `m` of `n_features` columns without replacement, returned in
/// declaration order. All columns are returned without touching the RNG when
/// `m >= n_features`.
pub(crate) fn sample_features(n_features: usize, m: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n_features).collect();
    if m >= n_features {
        return order;
    }
    // Partial Fisher-Yates over the first m positions.
    for i in 0..m {
        let j = rng.gen_range(i..n_features);
        order.swap(i, j);
    }
    order.truncate(m);
    order.sort_unstable();
    order
}

struct Grower<'a> {
    dataset: &'a Dataset,
    config: &'a TreeConfig,
    max_features: usize,
}

impl Grower<'_> {
    /// Split `rows` at branch `id`, record the branch, then recurse unless a
    /// stopping criterion holds.
    ///
    /// A degenerate child is absorbed here: it contributes no branches and its
    /// sibling still grows. The error only escapes for the root.
    fn grow_branch(
        &self,
        rows: &[usize],
        id: BranchId,
        rng: &mut impl Rng,
        table: &mut BranchTable,
    ) -> Result<(), TreeError> {
        let features = sample_features(self.dataset.n_features(), self.max_features, rng);
        let best = best_feature_and_split(self.dataset, rows, &features, self.config.n_candidates)?;

        table.insert(Branch {
            id: id.clone(),
            feature: best.feature,
            threshold: best.split.threshold,
            leaf_predictions: [best.split.left_prediction, best.split.right_prediction],
            impurity: best.split.impurity,
            n_observations: rows.len(),
        });

        if let Some(reason) = self.stop_reason(&id, &best.split) {
            trace!(branch = %id, ?reason, "branch stops");
            return Ok(());
        }

        for (direction, child_rows) in [
            (Direction::Left, &best.left_rows),
            (Direction::Right, &best.right_rows),
        ] {
            let child = id.child(direction);
            match self.grow_branch(child_rows, child.clone(), rng, table) {
                Ok(()) => {}
                Err(TreeError::DegenerateSplit { n_observations }) => {
                    trace!(branch = %child, n_observations, "degenerate partition, no split recorded");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn stop_reason(&self, id: &BranchId, split: &FeatureSplit) -> Option<StopReason> {
        if id.depth() >= self.config.max_depth {
            Some(StopReason::DepthLimit)
        } else if split.impurity.value() <= self.config.gini_threshold {
            Some(StopReason::Pure)
        } else if split.n_left.min(split.n_right) < self.config.min_observations {
            Some(StopReason::InsufficientData)
        } else {
            None
        }
    }
}

/// A fitted decision tree: the flat table of branches keyed by path code.
///
/// Branches are held in an arena in the order they were recorded (every
/// parent precedes its children) with a hash index for O(1) lookup by id.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BranchTable {
    pub(crate) branches: Vec<Branch>,
    pub(crate) index: HashMap<BranchId, usize>,
    pub(crate) feature_names: Vec<String>,
}

impl BranchTable {
    pub(crate) fn new(feature_names: Vec<String>) -> Self {
        Self {
            branches: Vec::new(),
            index: HashMap::new(),
            feature_names,
        }
    }

    pub(crate) fn insert(&mut self, branch: Branch) {
        debug_assert!(!self.index.contains_key(&branch.id), "branch ids are unique");
        debug_assert!(
            branch.id.parent().is_none_or(|p| self.index.contains_key(&p)),
            "parents are recorded before children"
        );
        self.index.insert(branch.id.clone(), self.branches.len());
        self.branches.push(branch);
    }

    /// Look up a branch by path code.
    #[must_use]
    pub fn get(&self, id: &BranchId) -> Option<&Branch> {
        self.index.get(id).map(|&i| &self.branches[i])
    }

    /// Return `true` if a branch with this id was recorded.
    #[must_use]
    pub fn contains(&self, id: &BranchId) -> bool {
        self.index.contains_key(id)
    }

    /// Return the root branch, if any.
    #[must_use]
    pub fn root(&self) -> Option<&Branch> {
        self.branches.first()
    }

    /// Iterate branches in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter()
    }

    /// Return the number of recorded branches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Return `true` if no branch was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Return the length of the longest branch id (0 for an empty table).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.branches.iter().map(|b| b.id.depth()).max().unwrap_or(0)
    }

    /// Return the feature names of the training schema.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the number of features the tree was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

impl fmt::Display for BranchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.branches {
            let name = self
                .feature_names
                .get(b.feature.index())
                .map_or("?", String::as_str);
            writeln!(
                f,
                "{:<12} {} <= {:.4}  [{:.3}, {:.3}]  n={} gini={}",
                b.id.as_str(),
                name,
                b.threshold,
                b.leaf_predictions[0],
                b.leaf_predictions[1],
                b.n_observations,
                b.impurity,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor_dataset() -> Dataset {
        let rows = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.1, 0.1],
            vec![0.1, 0.9],
            vec![0.9, 0.1],
            vec![0.9, 0.9],
        ];
        let labels = [0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        Dataset::from_unnamed_rows(&rows, &labels).unwrap()
    }

    fn separable_dataset() -> Dataset {
        let rows = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        Dataset::from_unnamed_rows(&rows, &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap()
    }

    #[test]
    fn separable_data_single_pure_branch() {
        let table = TreeConfig::new().fit(&separable_dataset()).unwrap();
        // Root split is pure, so the purity criterion stops growth immediately.
        assert_eq!(table.len(), 1);
        let root = table.root().unwrap();
        assert_eq!(root.id, BranchId::root());
        assert_eq!(root.feature.index(), 0);
        assert_eq!(root.leaf_predictions, [0.0, 1.0]);
        assert_eq!(root.n_observations, 6);
    }

    #[test]
    fn depth_limit_still_records_branch() {
        let table = TreeConfig::new()
            .with_max_depth(1)
            .fit(&xor_dataset())
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.depth(), 1);
    }

    #[test]
    fn xor_grows_second_level() {
        let table = TreeConfig::new()
            .with_max_depth(3)
            .fit(&xor_dataset())
            .unwrap();
        assert!(table.depth() >= 2);
        assert!(table.contains(&BranchId::parse("00").unwrap()));
        assert!(table.contains(&BranchId::parse("01").unwrap()));
    }

    #[test]
    fn every_parent_is_recorded() {
        let table = TreeConfig::new()
            .with_max_depth(5)
            .fit(&xor_dataset())
            .unwrap();
        for b in table.iter() {
            if let Some(parent) = b.id.parent() {
                assert!(table.contains(&parent), "missing parent of {}", b.id);
            }
        }
    }

    #[test]
    fn purity_threshold_stops_growth() {
        let table = TreeConfig::new()
            .with_max_depth(5)
            .with_gini_threshold(0.5)
            .fit(&xor_dataset())
            .unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn min_observations_stops_growth() {
        let table = TreeConfig::new()
            .with_max_depth(5)
            .with_min_observations(100)
            .fit(&xor_dataset())
            .unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn constant_root_is_degenerate() {
        let ds = Dataset::from_unnamed_rows(&[vec![1.0], vec![1.0]], &[0.0, 1.0]).unwrap();
        let err = TreeConfig::new().fit(&ds).unwrap_err();
        assert!(matches!(err, TreeError::DegenerateSplit { n_observations: 2 }));
    }

    #[test]
    fn degenerate_child_contributes_nothing() {
        // Right child holds identical feature values with mixed labels.
        let rows = vec![vec![0.0], vec![0.0], vec![1.0], vec![1.0], vec![1.0]];
        let ds = Dataset::from_unnamed_rows(&rows, &[0.0, 0.0, 1.0, 0.0, 1.0]).unwrap();
        let table = TreeConfig::new().with_max_depth(3).fit(&ds).unwrap();
        assert_eq!(table.len(), 1);
        let root = table.root().unwrap();
        assert!((root.leaf_predictions[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_config_rejected() {
        let ds = separable_dataset();
        assert!(matches!(
            TreeConfig::new().with_max_depth(0).fit(&ds).unwrap_err(),
            TreeError::InvalidMaxDepth { .. }
        ));
        assert!(matches!(
            TreeConfig::new().with_gini_threshold(0.7).fit(&ds).unwrap_err(),
            TreeError::InvalidGiniThreshold { .. }
        ));
        assert!(matches!(
            TreeConfig::new().with_min_observations(0).fit(&ds).unwrap_err(),
            TreeError::InvalidMinObservations { .. }
        ));
        assert!(matches!(
            TreeConfig::new().with_n_candidates(0).fit(&ds).unwrap_err(),
            TreeError::InvalidCandidateCount { .. }
        ));
        assert!(matches!(
            TreeConfig::new().with_max_features(Some(3)).fit(&ds).unwrap_err(),
            TreeError::InvalidMaxFeatures { max_features: 3, n_features: 2 }
        ));
    }

    #[test]
    fn sample_features_keeps_declaration_order() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..20 {
            let picked = sample_features(10, 3, &mut rng);
            assert_eq!(picked.len(), 3);
            assert!(picked.windows(2).all(|w| w[0] < w[1]));
        }
        assert_eq!(sample_features(4, 4, &mut rng), vec![0, 1, 2, 3]);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let config = TreeConfig::new()
            .with_max_depth(4)
            .with_max_features(Some(1))
            .with_seed(123);
        let a = config.fit(&xor_dataset()).unwrap();
        let b = config.fit(&xor_dataset()).unwrap();
        assert_eq!(format!("{a}"), format!("{b}"));
    }

    #[test]
    fn display_names_features() {
        let table = TreeConfig::new().fit(&separable_dataset()).unwrap();
        let rendered = format!("{table}");
        assert!(rendered.starts_with("0 "));
        assert!(rendered.contains("X1 <="));
    }
}
