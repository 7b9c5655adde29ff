use std::fmt;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gini impurity value in [0.0, 0.5].
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Impurity(f64);

impl Impurity {
    /// Create a new impurity value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// Side of a split: `Left` holds `value <= threshold`, `Right` holds `value > threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Path digit `0`.
    Left,
    /// Path digit `1`.
    Right,
}

impl Direction {
    /// Route a feature value against a split threshold.
    #[must_use]
    pub fn route(value: f64, threshold: f64) -> Self {
        if value <= threshold {
            Direction::Left
        } else {
            Direction::Right
        }
    }

    /// Return the path digit for this direction.
    #[must_use]
    pub fn digit(self) -> char {
        match self {
            Direction::Left => '0',
            Direction::Right => '1',
        }
    }

    /// Return the slot of this direction in a `[left, right]` pair.
    #[must_use]
    pub fn slot(self) -> usize {
        match self {
            Direction::Left => 0,
            Direction::Right => 1,
        }
    }
}

/// Path code of a branch: the root is `"0"` and each child appends `0` (left)
/// or `1` (right). The length of the code is the depth of the branch.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct BranchId(String);

impl BranchId {
    /// The root branch id, `"0"`.
    #[must_use]
    pub fn root() -> Self {
        Self("0".to_string())
    }

    /// Parse a path code. Returns `None` for an empty string or any character
    /// other than `0`/`1`.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        if code.is_empty() || !code.chars().all(|c| c == '0' || c == '1') {
            return None;
        }
        Some(Self(code.to_string()))
    }

    /// Return the id of the child in the given direction.
    #[must_use]
    pub fn child(&self, direction: Direction) -> Self {
        let mut code = String::with_capacity(self.0.len() + 1);
        code.push_str(&self.0);
        code.push(direction.digit());
        Self(code)
    }

    /// Return the parent id, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_string()))
    }

    /// Return the depth of this branch (the root has depth 1).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Return `true` for the root id.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Return the path code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One split decision recorded while growing a tree.
///
/// A branch is written once, before the builder decides whether to recurse
/// into its children, and is never modified afterwards. Its leaf predictions
/// are used whenever the child on the taken side was never grown.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Branch {
    /// Path code of this branch.
    pub id: BranchId,
    /// Feature the split is evaluated on.
    pub feature: FeatureIndex,
    /// Threshold value: observations with feature <= threshold go left.
    pub threshold: f64,
    /// Mean label of the `[left, right]` partitions at the time of the split.
    pub leaf_predictions: [f64; 2],
    /// Weighted Gini impurity of the chosen split.
    pub impurity: Impurity,
    /// Number of training observations that reached this branch.
    pub n_observations: usize,
}

impl Branch {
    /// Return the stored prediction for the given side.
    #[must_use]
    pub fn leaf_prediction(&self, direction: Direction) -> f64 {
        self.leaf_predictions[direction.slot()]
    }

    /// Route an observation's value for this branch's feature.
    #[must_use]
    pub fn route(&self, observation: &[f64]) -> Direction {
        Direction::route(observation[self.feature.index()], self.threshold)
    }
}
