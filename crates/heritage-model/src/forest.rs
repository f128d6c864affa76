//! Random forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{OobMode, RandomForestConfig};
use crate::error::ModelError;
use crate::importance::aggregate_importances;
use crate::oob::compute_oob;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::{RegressionTree, RegressionTreeConfig, to_column_major, validate_training_data};

/// A fitted random forest regressor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<RegressionTree>,
    pub(crate) n_features: usize,
    pub(crate) feature_names: Vec<String>,
}

/// Generate a bootstrap sample and the out-of-bag indices.
fn bootstrap_sample(
    n_samples: usize,
    draw_count: usize,
    rng: &mut impl Rng,
) -> (Vec<usize>, Vec<usize>) {
    let mut in_bag = vec![false; n_samples];
    let mut bootstrap_indices = Vec::with_capacity(draw_count);
    for _ in 0..draw_count {
        let idx = rng.gen_range(0..n_samples);
        bootstrap_indices.push(idx);
        in_bag[idx] = true;
    }
    let oob_indices: Vec<usize> = (0..n_samples).filter(|&i| !in_bag[i]).collect();
    (bootstrap_indices, oob_indices)
}

/// Train the random forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    targets: &[f64],
    feature_names: &[String],
) -> Result<RandomForestResult, ModelError> {
    let n_features = validate_training_data(features, targets)?;
    let n_samples = features.len();
    let max_features_resolved = config.max_features.resolve(n_features)?;

    if !(config.bootstrap_fraction > 0.0 && config.bootstrap_fraction <= 1.0) {
        return Err(ModelError::InvalidBootstrapFraction {
            fraction: config.bootstrap_fraction,
        });
    }

    let tree_config = RegressionTreeConfig::new()
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features_resolved));
    tree_config.validate(n_features)?;

    let draw_count = ((n_samples as f64) * config.bootstrap_fraction).ceil() as usize;

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        max_features = max_features_resolved,
        draw_count,
        "training random forest"
    );

    // Per-tree seeds come from the master RNG so the ensemble does not
    // depend on the rayon thread count.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let col_features = to_column_major(features, n_features);

    let tree_results: Vec<(RegressionTree, Vec<usize>)> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let (bootstrap_indices, oob_indices) =
                bootstrap_sample(n_samples, draw_count, &mut rng);
            let tree = tree_config.clone().with_seed(rng.r#gen()).grow(
                &col_features,
                targets,
                &bootstrap_indices,
                max_features_resolved,
            );
            (tree, oob_indices)
        })
        .collect();

    let (trees, oob_indices_per_tree): (Vec<RegressionTree>, Vec<Vec<usize>>) =
        tree_results.into_iter().unzip();

    let per_tree_importances: Vec<Vec<f64>> =
        trees.iter().map(RegressionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree_importances, feature_names);

    debug!(n_trees_trained = trees.len(), "tree training complete");

    let oob_score = if config.oob_mode == OobMode::Enabled {
        Some(compute_oob(&trees, features, targets, &oob_indices_per_tree)?)
    } else {
        None
    };

    let forest = RandomForest {
        trees,
        n_features,
        feature_names: feature_names.to_vec(),
    };

    let n_trees = forest.trees.len() as f64;
    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_samples,
        n_features,
        max_features: max_features_resolved,
        draw_count,
        mean_depth: forest.trees.iter().map(|t| t.depth() as f64).sum::<f64>() / n_trees,
        mean_leaves: forest.trees.iter().map(|t| t.n_leaves() as f64).sum::<f64>() / n_trees,
    };

    info!(
        oob_r2 = oob_score.as_ref().map(|s| s.r2),
        mean_depth = metadata.mean_depth,
        "random forest training complete"
    );

    Ok(RandomForestResult {
        forest,
        importances,
        oob_score,
        metadata,
    })
}
