//! Ordinary least squares with an intercept.

use tracing::{debug, info, instrument};

use crate::error::ModelError;
use crate::tree::validate_training_data;

/// Residual variance share below which a column counts as collinear with
/// the columns before it.
const ALIAS_TOLERANCE: f64 = 1e-9;

/// A fitted linear regression.
///
/// Coefficients are in the original feature units. Columns that are
/// constant or an exact linear combination of earlier columns are aliased:
/// their coefficient is fixed at zero.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LinearRegression {
    intercept: f64,
    coefficients: Vec<f64>,
    aliased: Vec<bool>,
    feature_names: Vec<String>,
}

impl LinearRegression {
    /// Fit by least squares on standardised columns.
    ///
    /// The normal equations are reduced by Gaussian elimination in column
    /// order; a pivot whose residual variance falls below the tolerance
    /// marks that column aliased and drops it from the system.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ModelError::EmptyDataset`] | `features` is empty |
    /// | [`ModelError::ZeroFeatures`] | rows have zero feature columns |
    /// | [`ModelError::FeatureCountMismatch`] | rows have inconsistent lengths |
    /// | [`ModelError::NonFiniteValue`] | any value is NaN or infinite |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn fit(features: &[Vec<f64>], targets: &[f64], feature_names: &[String]) -> Result<Self, ModelError> {
        let p = validate_training_data(features, targets)?;
        let n = features.len() as f64;

        let y_mean = targets.iter().sum::<f64>() / n;
        let means: Vec<f64> = (0..p)
            .map(|j| features.iter().map(|row| row[j]).sum::<f64>() / n)
            .collect();
        let scales: Vec<f64> = (0..p)
            .map(|j| {
                let ss: f64 = features.iter().map(|row| (row[j] - means[j]).powi(2)).sum();
                (ss / n).sqrt()
            })
            .collect();

        // Z'Z and Z'y over standardised columns; constant columns stay zero.
        let z = |row: &[f64], j: usize| {
            if scales[j] > 0.0 {
                (row[j] - means[j]) / scales[j]
            } else {
                0.0
            }
        };
        let mut gram = vec![vec![0.0f64; p]; p];
        let mut rhs = vec![0.0f64; p];
        for (row, &y) in features.iter().zip(targets) {
            let zs: Vec<f64> = (0..p).map(|j| z(row, j)).collect();
            for i in 0..p {
                rhs[i] += zs[i] * (y - y_mean);
                for j in i..p {
                    gram[i][j] += zs[i] * zs[j];
                }
            }
        }
        for i in 0..p {
            for j in 0..i {
                gram[i][j] = gram[j][i];
            }
        }

        let mut aliased = vec![false; p];
        for k in 0..p {
            let pivot = gram[k][k];
            if pivot <= ALIAS_TOLERANCE * n {
                aliased[k] = true;
                continue;
            }
            for i in (k + 1)..p {
                if aliased[i] {
                    continue;
                }
                let factor = gram[i][k] / pivot;
                if factor == 0.0 {
                    continue;
                }
                for j in k..p {
                    gram[i][j] -= factor * gram[k][j];
                }
                rhs[i] -= factor * rhs[k];
            }
        }

        let mut beta = vec![0.0f64; p];
        for k in (0..p).rev() {
            if aliased[k] {
                continue;
            }
            let tail: f64 = ((k + 1)..p)
                .filter(|&j| !aliased[j])
                .map(|j| gram[k][j] * beta[j])
                .sum();
            beta[k] = (rhs[k] - tail) / gram[k][k];
        }

        let coefficients: Vec<f64> = (0..p)
            .map(|j| if aliased[j] { 0.0 } else { beta[j] / scales[j] })
            .collect();
        let intercept = y_mean - coefficients.iter().zip(&means).map(|(c, m)| c * m).sum::<f64>();

        let n_aliased = aliased.iter().filter(|&&a| a).count();
        for (name, _) in feature_names.iter().zip(&aliased).filter(|(_, a)| **a) {
            debug!(column = %name, "column aliased, coefficient fixed at zero");
        }
        info!(n_features = p, n_aliased, intercept, "linear regression fitted");

        Ok(Self {
            intercept,
            coefficients,
            aliased,
            feature_names: feature_names.to_vec(),
        })
    }

    /// Predict a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FeatureCountMismatch`] when `sample.len()` differs
    /// from the number of coefficients.
    pub fn predict(&self, sample: &[f64]) -> Result<f64, ModelError> {
        if sample.len() != self.coefficients.len() {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.coefficients.len(),
                got: sample.len(),
                sample_index: 0,
            });
        }
        Ok(self.intercept + self.coefficients.iter().zip(sample).map(|(c, x)| c * x).sum::<f64>())
    }

    /// Predict every row in order.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FeatureCountMismatch`] for the first row with the
    /// wrong width.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        features
            .iter()
            .enumerate()
            .map(|(sample_index, row)| {
                self.predict(row).map_err(|_| ModelError::FeatureCountMismatch {
                    expected: self.coefficients.len(),
                    got: row.len(),
                    sample_index,
                })
            })
            .collect()
    }

    /// Return the intercept.
    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Return the coefficients in feature order, in original units.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Return the names of aliased columns.
    #[must_use]
    pub fn aliased(&self) -> Vec<&str> {
        self.feature_names
            .iter()
            .zip(&self.aliased)
            .filter(|(_, a)| **a)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Return `(name, coefficient)` pairs in feature order.
    #[must_use]
    pub fn named_coefficients(&self) -> Vec<(&str, f64)> {
        self.feature_names
            .iter()
            .map(String::as_str)
            .zip(self.coefficients.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn recovers_exact_plane() {
        let features: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![i as f64, ((i * 7) % 11) as f64])
            .collect();
        let targets: Vec<f64> = features.iter().map(|r| 2.0 + 3.0 * r[0] - r[1]).collect();
        let model = LinearRegression::fit(&features, &targets, &names(&["a", "b"])).unwrap();
        assert!((model.intercept() - 2.0).abs() < 1e-8);
        assert!((model.coefficients()[0] - 3.0).abs() < 1e-8);
        assert!((model.coefficients()[1] + 1.0).abs() < 1e-8);
        assert!(model.aliased().is_empty());
    }

    #[test]
    fn collinear_sum_column_is_aliased() {
        // c = a + b, like TotalSF and its parts.
        let features: Vec<Vec<f64>> = (0..30)
            .map(|i| {
                let a = (i * 13 % 17) as f64 * 100.0;
                let b = (i * 5 % 7) as f64 * 50.0;
                vec![a, b, a + b]
            })
            .collect();
        let targets: Vec<f64> = features.iter().map(|r| 1000.0 + 2.0 * r[0] + 4.0 * r[1]).collect();
        let model = LinearRegression::fit(&features, &targets, &names(&["a", "b", "c"])).unwrap();
        assert_eq!(model.aliased(), vec!["c"]);
        assert_eq!(model.coefficients()[2], 0.0);
        for (row, y) in features.iter().zip(&targets) {
            assert!((model.predict(row).unwrap() - y).abs() < 1e-6);
        }
    }

    #[test]
    fn constant_column_is_aliased() {
        let features: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 5.0]).collect();
        let targets: Vec<f64> = (0..10).map(|i| 4.0 * i as f64).collect();
        let model = LinearRegression::fit(&features, &targets, &names(&["x", "k"])).unwrap();
        assert_eq!(model.aliased(), vec!["k"]);
        assert!((model.predict(&[2.5, 5.0]).unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn predict_checks_width() {
        let features = vec![vec![1.0], vec![2.0]];
        let model = LinearRegression::fit(&features, &[1.0, 2.0], &names(&["x"])).unwrap();
        assert!(matches!(
            model.predict_batch(&[vec![1.0], vec![1.0, 2.0]]),
            Err(ModelError::FeatureCountMismatch { sample_index: 1, .. })
        ));
    }

    #[test]
    fn rejects_non_finite() {
        let err = LinearRegression::fit(&[vec![f64::NAN]], &[1.0], &names(&["x"])).unwrap_err();
        assert!(matches!(err, ModelError::NonFiniteValue { .. }));
    }
}
