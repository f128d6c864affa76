use rand::Rng;

use crate::node::FeatureIndex;

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Threshold value.
    pub(crate) threshold: f64,
    /// Gain of the split; the weighted variance decrease when `l2 == 0`.
    pub(crate) gain: f64,
    /// Sample indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

/// Score of a child holding `n` samples whose targets sum to `sum`.
///
/// With `l2 == 0` this is `n * mean²`, and the gain of a split reduces to the
/// decrease in summed squared error. With `l2 > 0` it is the squared-error
/// boosting structure score with unit hessians.
fn score(sum: f64, n: usize, l2: f64) -> f64 {
    sum * sum / (n as f64 + l2)
}

/// Find the best split among a random subset of features.
///
/// For each of `max_features` randomly chosen features, sorts the
/// `(value, target)` pairs, scans left-to-right with running target sums,
/// and tracks the globally best split by gain. Only strictly positive gains
/// are accepted.
///
/// Returns `None` when no valid split exists (all values identical,
/// or split would violate `min_samples_leaf`).
///
/// `features` is column-major: `features[feature_idx][sample_idx]`.
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    targets: &[f64],
    sample_indices: &[usize],
    max_features: usize,
    min_samples_leaf: usize,
    l2: f64,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = features.len();
    let n_samples = sample_indices.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let total_sum: f64 = sample_indices.iter().map(|&si| targets[si]).sum();
    let parent_score = score(total_sum, n_samples, l2);

    // Partial Fisher-Yates: shuffle only the first `max_features` positions.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best_gain = 0.0;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feat_idx in &feature_order[..take] {
        let feat_col = &features[feat_idx];

        let mut sorted: Vec<(f64, f64)> = sample_indices
            .iter()
            .map(|&si| (feat_col[si], targets[si]))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        for i in 0..(n_samples - 1) {
            let (val_i, target_i) = sorted[i];
            left_sum += target_i;

            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            let n_left = i + 1;
            let n_right = n_samples - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let gain = score(left_sum, n_left, l2) + score(right_sum, n_right, l2) - parent_score;

            if gain > best_gain {
                best_gain = gain;
                best = Some((FeatureIndex::new(feat_idx), midpoint(val_i, val_next)));
            }
        }
    }

    let (feature, threshold) = best?;

    let feat_col = &features[feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| feat_col[si] <= threshold);

    Some(SplitResult {
        feature,
        threshold,
        gain: best_gain,
        left_indices,
        right_indices,
    })
}

/// Threshold between two distinct sorted values that keeps `lo` on the left
/// and `hi` on the right. Adjacent floats round their midpoint up to `hi`.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid.is_finite() && mid < hi { mid } else { lo }
}
