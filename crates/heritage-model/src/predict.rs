//! Prediction methods for the random forest ensemble.

use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

use crate::error::ModelError;
use crate::forest::RandomForest;
use crate::importance::{RankedFeature, aggregate_importances};
use crate::tree::RegressionTree;

impl RandomForest {
    /// Predict the target for a single sample: the mean over all trees.
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
        let sum: f64 = self.trees.iter().map(|t| t.predict_unchecked(sample)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    /// Predict a batch of samples in parallel, preserving input order.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FeatureCountMismatch`] naming the first sample
    /// with the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        features
            .par_iter()
            .enumerate()
            .map(|(sample_index, sample)| {
                self.predict(sample).map_err(|e| match e {
                    ModelError::FeatureCountMismatch { expected, got, .. } => {
                        ModelError::FeatureCountMismatch {
                            expected,
                            got,
                            sample_index,
                        }
                    }
                    other => other,
                })
            })
            .collect()
    }

    /// Return MDI importances aggregated over all trees, ranked.
    #[must_use]
    pub fn importances(&self) -> Vec<RankedFeature> {
        let per_tree: Vec<Vec<f64>> = self.trees.iter().map(RegressionTree::feature_importances).collect();
        aggregate_importances(&per_tree, &self.feature_names)
    }

    /// Return the fitted trees.
    #[must_use]
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RandomForestConfig;
    use crate::error::ModelError;

    fn fitted() -> crate::forest::RandomForest {
        let features: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64, 1.0]).collect();
        let targets: Vec<f64> = (0..30).map(|i| if i < 15 { 10.0 } else { 20.0 }).collect();
        let names = vec!["a".to_string(), "b".to_string()];
        RandomForestConfig::new(8).unwrap().fit(&features, &targets, &names).unwrap().into_forest()
    }

    #[test]
    fn prediction_is_tree_mean() {
        let forest = fitted();
        let sample = [3.0, 1.0];
        let mean = forest.trees().iter().map(|t| t.predict(&sample).unwrap()).sum::<f64>()
            / forest.n_trees() as f64;
        assert_eq!(forest.predict(&sample).unwrap(), mean);
    }

    #[test]
    fn batch_matches_single_and_keeps_order() {
        let forest = fitted();
        let samples: Vec<Vec<f64>> = vec![vec![29.0, 1.0], vec![0.0, 1.0], vec![14.0, 1.0]];
        let batch = forest.predict_batch(&samples).unwrap();
        for (sample, got) in samples.iter().zip(&batch) {
            assert_eq!(forest.predict(sample).unwrap(), *got);
        }
        assert!(batch[0] > batch[1]);
    }

    #[test]
    fn batch_reports_offending_sample() {
        let forest = fitted();
        let samples = vec![vec![1.0, 1.0], vec![1.0]];
        let err = forest.predict_batch(&samples).unwrap_err();
        assert!(matches!(err, ModelError::FeatureCountMismatch { sample_index: 1, .. }));
    }

    #[test]
    fn importances_cover_all_features() {
        let forest = fitted();
        let imp = forest.importances();
        assert_eq!(imp.len(), 2);
        assert_eq!(imp[0].name, "a");
    }
}
