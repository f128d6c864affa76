//! Reproducible train/test partitioning.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::error::FrameError;
use crate::table::FeatureTable;

/// Default share of rows held out for evaluation.
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Default partition seed.
pub const DEFAULT_SEED: u64 = 42;

/// A disjoint partition of a feature table.
#[derive(Debug, Clone)]
pub struct Split {
    /// Rows used for fitting.
    pub train: FeatureTable,
    /// Rows held out for evaluation.
    pub test: FeatureTable,
    /// Source row index of each training row, in training-set order.
    pub train_indices: Vec<usize>,
    /// Source row index of each test row, in test-set order.
    pub test_indices: Vec<usize>,
}

/// Number of test rows for a table of `n_rows`: `floor(n_rows * fraction)`,
/// clamped so neither side of the partition is empty.
#[must_use]
pub fn test_size(n_rows: usize, test_fraction: f64) -> usize {
    let n_test = (n_rows as f64 * test_fraction).floor() as usize;
    n_test.clamp(1, n_rows.saturating_sub(1).max(1))
}

/// Shuffle row indices with a seeded RNG, then cut off the test rows.
///
/// Identical input and seed always yield the identical partition.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`FrameError::InvalidTestFraction`] | `test_fraction` not in (0.0, 1.0) |
/// | [`FrameError::TooFewRows`] | fewer than 2 rows |
#[instrument(skip(table), fields(n_rows = table.n_rows()))]
pub fn split(table: &FeatureTable, test_fraction: f64, seed: u64) -> Result<Split, FrameError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(FrameError::InvalidTestFraction {
            fraction: test_fraction,
        });
    }
    let n_rows = table.n_rows();
    if n_rows < 2 {
        return Err(FrameError::TooFewRows { n_rows });
    }

    let mut order: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let n_test = test_size(n_rows, test_fraction);
    let test_indices = order[..n_test].to_vec();
    let train_indices = order[n_test..].to_vec();

    info!(n_train = train_indices.len(), n_test, "table split");

    Ok(Split {
        train: table.select_rows(&train_indices),
        test: table.select_rows(&test_indices),
        train_indices,
        test_indices,
    })
}
