//! Exploratory correlation of features against the target.

use tracing::{debug, instrument};

use crate::error::FrameError;
use crate::table::FeatureTable;

/// Pearson correlation of one feature column with the target.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Correlation {
    /// Feature column name.
    pub column: String,
    /// Coefficient in [-1, 1], or `None` when either side has zero variance.
    pub coefficient: Option<f64>,
}

/// Pearson correlation coefficient of two equal-length samples.
///
/// Returns `None` if the samples differ in length, have fewer than two
/// points, or either has zero variance.
#[must_use]
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// Correlate every non-target column with `target`.
///
/// Sorted by absolute coefficient, strongest first; undefined coefficients
/// go last, and ties keep schema order.
///
/// # Errors
///
/// Returns [`FrameError::MissingTarget`] if `target` is not in the table.
#[instrument(skip(table), fields(n_rows = table.n_rows()))]
pub fn correlate_with_target(table: &FeatureTable, target: &str) -> Result<Vec<Correlation>, FrameError> {
    let (features, y) = table.split_target(target)?;

    let mut correlations: Vec<Correlation> = features
        .schema()
        .iter()
        .map(|column| {
            let x = features.column(column).unwrap_or_default();
            Correlation {
                column: column.to_string(),
                coefficient: pearson(&x, &y),
            }
        })
        .collect();

    correlations.sort_by(|a, b| match (a.coefficient, b.coefficient) {
        (Some(ra), Some(rb)) => rb.abs().total_cmp(&ra.abs()),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    if let Some(top) = correlations.first() {
        debug!(column = %top.column, coefficient = ?top.coefficient, "strongest correlation");
    }
    Ok(correlations)
}
