//! Out-of-bag (OOB) evaluation for the random forest.

use crate::error::ModelError;
use crate::metrics::{mean_squared_error, r2_score};
use crate::tree::RegressionTree;

/// Out-of-bag evaluation result.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OobScore {
    /// R² of OOB predictions over the samples that had any OOB tree.
    pub r2: f64,
    /// MSE of the same predictions.
    pub mse: f64,
    /// Number of samples that had at least one OOB tree.
    pub n_oob_samples: usize,
}

/// Compute out-of-bag predictions and score them.
///
/// Each sample is predicted by the mean of the trees whose bootstrap did
/// not contain it. Samples with no OOB tree are skipped.
pub(crate) fn compute_oob(
    trees: &[RegressionTree],
    features: &[Vec<f64>],
    targets: &[f64],
    oob_indices_per_tree: &[Vec<usize>],
) -> Result<OobScore, ModelError> {
    let n_samples = features.len();
    let mut sums = vec![0.0f64; n_samples];
    let mut counts = vec![0usize; n_samples];

    for (tree, oob_indices) in trees.iter().zip(oob_indices_per_tree) {
        for &sample_idx in oob_indices {
            sums[sample_idx] += tree.predict_unchecked(&features[sample_idx]);
            counts[sample_idx] += 1;
        }
    }

    let mut actual = Vec::new();
    let mut predicted = Vec::new();
    for i in 0..n_samples {
        if counts[i] > 0 {
            actual.push(targets[i]);
            predicted.push(sums[i] / counts[i] as f64);
        }
    }

    if actual.is_empty() {
        return Err(ModelError::OobEvaluationFailed {
            reason: "no sample has any OOB tree".to_string(),
        });
    }

    Ok(OobScore {
        r2: r2_score(&actual, &predicted)?,
        mse: mean_squared_error(&actual, &predicted)?,
        n_oob_samples: actual.len(),
    })
}
