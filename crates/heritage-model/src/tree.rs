use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    ModelError,
    node::{Impurity, Node, NodeIndex},
    split::find_best_split,
};

/// Configuration for a single CART regression tree.
///
/// Construct via [`RegressionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `l2_regularization` | 0.0                   |
/// | `seed`              | 42                    |
#[derive(Debug, Clone)]
pub struct RegressionTreeConfig {
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) l2_regularization: f64,
    pub(crate) seed: u64,
}

impl RegressionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            l2_regularization: 0.0,
            seed: 42,
        }
    }

    /// Set the maximum tree depth.
    ///
    /// `None` means grow until leaves are pure or stopping conditions are
    /// met. `Some(d)` limits depth to `d` levels (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the maximum number of features to consider at each split.
    ///
    /// `None` means consider all features.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the L2 penalty on leaf values.
    ///
    /// A leaf predicts `sum / (n + lambda)`; zero gives the plain mean.
    #[must_use]
    pub fn with_l2_regularization(mut self, lambda: f64) -> Self {
        self.l2_regularization = lambda;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the maximum features to consider per split, if set.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Return the L2 leaf penalty.
    #[must_use]
    pub fn l2_regularization(&self) -> f64 {
        self.l2_regularization
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a regression tree on the provided row-major dataset.
    ///
    /// `features[sample_idx][feature_idx]` is row-major.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ModelError::EmptyDataset`] | `features` is empty |
    /// | [`ModelError::ZeroFeatures`] | rows have zero feature columns |
    /// | [`ModelError::FeatureCountMismatch`] | rows have inconsistent lengths |
    /// | [`ModelError::TargetLengthMismatch`] | `targets.len() != features.len()` |
    /// | [`ModelError::NonFiniteValue`] | any value is NaN or infinite |
    /// | [`ModelError::InvalidMaxFeatures`] | `max_features` outside [1, n_features] |
    /// | [`ModelError::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`ModelError::InvalidMinSamplesSplit`] | `min_samples_split` < 2 |
    /// | [`ModelError::InvalidMinSamplesLeaf`] | `min_samples_leaf` < 1 |
    /// | [`ModelError::InvalidRegularization`] | negative or non-finite L2 penalty |
    #[instrument(skip(self, features, targets), fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<RegressionTree, ModelError> {
        let n_features = validate_training_data(features, targets)?;
        let max_features = self.validate(n_features)?;

        let col_features = to_column_major(features, n_features);
        let sample_indices: Vec<usize> = (0..features.len()).collect();
        Ok(self.grow(&col_features, targets, &sample_indices, max_features))
    }

    /// Check the config against the data width and resolve `max_features`.
    pub(crate) fn validate(&self, n_features: usize) -> Result<usize, ModelError> {
        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(ModelError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(ModelError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(ModelError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        if !(self.l2_regularization.is_finite() && self.l2_regularization >= 0.0) {
            return Err(ModelError::InvalidRegularization {
                lambda: self.l2_regularization,
            });
        }
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(ModelError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }
        Ok(max_features)
    }

    /// Grow a tree over `sample_indices` of pre-validated column-major data.
    ///
    /// Indices may repeat, as in a bootstrap sample.
    pub(crate) fn grow(
        &self,
        col_features: &[Vec<f64>],
        targets: &[f64],
        sample_indices: &[usize],
        max_features: usize,
    ) -> RegressionTree {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut arena: Vec<Node> = Vec::new();
        let mut builder = TreeBuilder {
            col_features,
            targets,
            config: self,
            max_features,
            rng: &mut rng,
            arena: &mut arena,
        };
        let root = builder.build(sample_indices, 0);

        debug!(root_index = root.index(), n_nodes = arena.len(), "regression tree built");

        RegressionTree {
            nodes: arena,
            n_features: col_features.len(),
        }
    }
}

impl Default for RegressionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate row-major training data, returning the feature count.
pub(crate) fn validate_training_data(features: &[Vec<f64>], targets: &[f64]) -> Result<usize, ModelError> {
    if features.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    if targets.len() != features.len() {
        return Err(ModelError::TargetLengthMismatch {
            n_samples: features.len(),
            n_targets: targets.len(),
        });
    }
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(ModelError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ModelError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteValue {
                column: format!("feature {feature_index}"),
                row_index: sample_index,
            });
        }
    }
    if let Some(row_index) = targets.iter().position(|v| !v.is_finite()) {
        return Err(ModelError::NonFiniteValue {
            column: "target".to_string(),
            row_index,
        });
    }
    Ok(n_features)
}

pub(crate) fn to_column_major(features: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    (0..n_features)
        .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
        .collect()
}

struct TreeBuilder<'a, 'r> {
    col_features: &'a [Vec<f64>],
    targets: &'a [f64],
    config: &'a RegressionTreeConfig,
    max_features: usize,
    rng: &'r mut ChaCha8Rng,
    arena: &'r mut Vec<Node>,
}

impl TreeBuilder<'_, '_> {
    /// Recursively build the subtree for `sample_indices`.
    ///
    /// Returns the [`NodeIndex`] of the node just created in the arena.
    fn build(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let n_samples = sample_indices.len();
        let impurity = Impurity::of(self.targets, sample_indices);

        let depth_exceeded = self.config.max_depth.is_some_and(|max_d| depth >= max_d);
        let too_few = n_samples < self.config.min_samples_split;
        let pure = impurity.value() == 0.0;

        if too_few || pure || depth_exceeded {
            return self.leaf(sample_indices, impurity);
        }

        let Some(split) = find_best_split(
            self.col_features,
            self.targets,
            sample_indices,
            self.max_features,
            self.config.min_samples_leaf,
            self.config.l2_regularization,
            &mut *self.rng,
        ) else {
            return self.leaf(sample_indices, impurity);
        };
        if split.left_indices.is_empty() || split.right_indices.is_empty() {
            return self.leaf(sample_indices, impurity);
        }

        // Reserve the slot so children get higher indices, then overwrite.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            value: 0.0,
            impurity,
            n_samples,
        });

        let left = self.build(&split.left_indices, depth + 1);
        let right = self.build(&split.right_indices, depth + 1);

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            impurity_decrease: split.gain,
        };

        NodeIndex::new(node_idx)
    }

    fn leaf(&mut self, sample_indices: &[usize], impurity: Impurity) -> NodeIndex {
        let n_samples = sample_indices.len();
        let sum: f64 = sample_indices.iter().map(|&i| self.targets[i]).sum();
        let value = sum / (n_samples as f64 + self.config.l2_regularization);
        let idx = self.arena.len();
        self.arena.push(Node::Leaf {
            value,
            impurity,
            n_samples,
        });
        NodeIndex::new(idx)
    }
}

/// A fitted CART regression tree.
///
/// Stored as an arena-based `Vec<Node>` with the root at index 0.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RegressionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl RegressionTree {
    /// Predict the target for a single sample.
    ///
    /// Traverses from the root: at each `Split`, goes left when
    /// `sample[feature] <= threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FeatureCountMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<f64, ModelError> {
        if sample.len() != self.n_features {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.n_features,
                got: sample.len(),
                sample_index: 0,
            });
        }
        Ok(self.predict_unchecked(sample))
    }

    /// Traverse to a leaf without checking the sample width.
    pub(crate) fn predict_unchecked(&self, sample: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }

    /// Compute Mean Decrease in Impurity (MDI) feature importances.
    ///
    /// Split gains are accumulated by feature index, then normalized to sum
    /// to 1.0. All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Return the nodes in arena order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the total number of nodes in the tree.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the number of features this tree was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the maximum depth of the tree; a single leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((node_idx, d)) = stack.pop() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), d + 1));
                    stack.push((right.index(), d + 1));
                }
            }
        }
        max_depth
    }
}
