//! Gradient-boosted regression trees on squared error.
//!
//! Boosting starts from the training-target mean; each round fits a depth-
//! limited tree to the current residuals and adds its output scaled by the
//! learning rate. Leaves are shrunk by an L2 penalty, so a leaf predicts
//! `sum(residuals) / (n + lambda)`.

use rand::Rng;
use rand::SeedableRng;
use rand::seq::index::sample;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::error::ModelError;
use crate::importance::{RankedFeature, aggregate_importances};
use crate::tree::{RegressionTree, RegressionTreeConfig, to_column_major, validate_training_data};

/// Configuration for gradient boosting.
///
/// Construct via [`GradientBoostingConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default |
/// |---------------------|---------|
/// | `learning_rate`     | 0.3     |
/// | `max_depth`         | 6       |
/// | `min_samples_leaf`  | 1       |
/// | `l2_regularization` | 1.0     |
/// | `subsample`         | 1.0     |
/// | `seed`              | 42      |
#[derive(Debug, Clone)]
pub struct GradientBoostingConfig {
    pub(crate) n_rounds: usize,
    pub(crate) learning_rate: f64,
    pub(crate) max_depth: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) l2_regularization: f64,
    pub(crate) subsample: f64,
    pub(crate) seed: u64,
}

impl GradientBoostingConfig {
    /// Create a new config with the given number of boosting rounds.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidTreeCount`] if `n_rounds` is zero.
    pub fn new(n_rounds: usize) -> Result<Self, ModelError> {
        if n_rounds == 0 {
            return Err(ModelError::InvalidTreeCount { n_trees: n_rounds });
        }
        Ok(Self {
            n_rounds,
            learning_rate: 0.3,
            max_depth: 6,
            min_samples_leaf: 1,
            l2_regularization: 1.0,
            subsample: 1.0,
            seed: 42,
        })
    }

    /// Set the shrinkage applied to each round's tree.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the depth limit of each round's tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples in each leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the L2 penalty on leaf values.
    #[must_use]
    pub fn with_l2_regularization(mut self, lambda: f64) -> Self {
        self.l2_regularization = lambda;
        self
    }

    /// Set the fraction of rows drawn (without replacement) for each round.
    #[must_use]
    pub fn with_subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of boosting rounds.
    #[must_use]
    pub fn n_rounds(&self) -> usize {
        self.n_rounds
    }

    /// Return the learning rate.
    #[must_use]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Return the per-tree depth limit.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the L2 leaf penalty.
    #[must_use]
    pub fn l2_regularization(&self) -> f64 {
        self.l2_regularization
    }

    /// Return the row subsample ratio.
    #[must_use]
    pub fn subsample(&self) -> f64 {
        self.subsample
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fit a boosted ensemble on row-major `features`.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ModelError::EmptyDataset`] | `features` is empty |
    /// | [`ModelError::NonFiniteValue`] | any value is NaN or infinite |
    /// | [`ModelError::InvalidLearningRate`] | `learning_rate` not in (0.0, 1.0] |
    /// | [`ModelError::InvalidSubsample`] | `subsample` not in (0.0, 1.0] |
    /// | [`ModelError::InvalidMaxDepth`] | `max_depth` is 0 |
    /// | [`ModelError::InvalidRegularization`] | negative or non-finite L2 penalty |
    #[instrument(skip_all, fields(n_rounds = self.n_rounds, n_samples = features.len()))]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        feature_names: &[String],
    ) -> Result<GradientBoostedTrees, ModelError> {
        let n_features = validate_training_data(features, targets)?;
        let n_samples = features.len();

        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ModelError::InvalidLearningRate {
                learning_rate: self.learning_rate,
            });
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(ModelError::InvalidSubsample {
                subsample: self.subsample,
            });
        }

        let tree_config = RegressionTreeConfig::new()
            .with_max_depth(Some(self.max_depth))
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_l2_regularization(self.l2_regularization);
        let max_features = tree_config.validate(n_features)?;

        let base_score = targets.iter().sum::<f64>() / n_samples as f64;
        let draw_count = ((n_samples as f64 * self.subsample).ceil() as usize).clamp(1, n_samples);

        info!(
            n_rounds = self.n_rounds,
            n_samples,
            n_features,
            base_score,
            draw_count,
            "training gradient boosting"
        );

        let col_features = to_column_major(features, n_features);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut predictions = vec![base_score; n_samples];
        let mut residuals = vec![0.0f64; n_samples];
        let mut trees = Vec::with_capacity(self.n_rounds);

        for round in 0..self.n_rounds {
            for ((r, &y), &p) in residuals.iter_mut().zip(targets).zip(&predictions) {
                *r = y - p;
            }

            let rows: Vec<usize> = if draw_count == n_samples {
                (0..n_samples).collect()
            } else {
                let mut picked = sample(&mut rng, n_samples, draw_count).into_vec();
                picked.sort_unstable();
                picked
            };

            let tree = tree_config
                .clone()
                .with_seed(rng.r#gen())
                .grow(&col_features, &residuals, &rows, max_features);

            for (p, row) in predictions.iter_mut().zip(features) {
                *p += self.learning_rate * tree.predict_unchecked(row);
            }

            debug!(round, n_leaves = tree.n_leaves(), "boosting round complete");
            trees.push(tree);
        }

        info!(n_trees = trees.len(), "gradient boosting complete");

        Ok(GradientBoostedTrees {
            base_score,
            learning_rate: self.learning_rate,
            trees,
            n_features,
            feature_names: feature_names.to_vec(),
        })
    }
}

/// A fitted gradient-boosted ensemble.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientBoostedTrees {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
    feature_names: Vec<String>,
}

impl GradientBoostedTrees {
    /// Predict a single sample: the base score plus every tree's shrunk output.
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
        Ok(self.trees.iter().fold(self.base_score, |acc, t| {
            acc + self.learning_rate * t.predict_unchecked(sample)
        }))
    }

    /// Predict a batch of samples in parallel, preserving input order.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FeatureCountMismatch`] for the first sample with
    /// the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        features
            .par_iter()
            .enumerate()
            .map(|(sample_index, sample)| {
                if sample.len() != self.n_features {
                    return Err(ModelError::FeatureCountMismatch {
                        expected: self.n_features,
                        got: sample.len(),
                        sample_index,
                    });
                }
                self.predict(sample)
            })
            .collect()
    }

    /// Return split-gain importances aggregated over all rounds, ranked.
    #[must_use]
    pub fn importances(&self) -> Vec<RankedFeature> {
        let per_tree: Vec<Vec<f64>> = self.trees.iter().map(RegressionTree::feature_importances).collect();
        aggregate_importances(&per_tree, &self.feature_names)
    }

    /// Return the initial prediction (training-target mean).
    #[must_use]
    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    /// Return the learning rate used at fit time.
    #[must_use]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Return the number of boosting rounds.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the number of features the ensemble was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }
}
