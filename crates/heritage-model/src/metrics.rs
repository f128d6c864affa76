//! Regression metrics and model evaluation.

use heritage_frame::{FeatureTable, Split};
use tracing::{info, instrument};

use crate::error::ModelError;
use crate::model::Model;

/// Minimum test-set R² the housing model is expected to reach.
pub const TARGET_R2: f64 = 0.75;

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<(), ModelError> {
    if actual.len() != predicted.len() {
        return Err(ModelError::LengthMismatch {
            actual: actual.len(),
            predicted: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    Ok(())
}

/// Mean of squared residuals.
///
/// # Errors
///
/// [`ModelError::LengthMismatch`] or [`ModelError::EmptyDataset`].
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64, ModelError> {
    check_lengths(actual, predicted)?;
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    Ok(ss_res / actual.len() as f64)
}

/// Coefficient of determination: `1 - ss_res / ss_tot`.
///
/// A constant target reproduced to within rounding scores 1.0.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`ModelError::UndefinedR2`] | constant target with non-zero residuals |
/// | [`ModelError::LengthMismatch`] | series lengths differ |
/// | [`ModelError::EmptyDataset`] | series are empty |
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Result<f64, ModelError> {
    check_lengths(actual, predicted)?;
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    // Rounding in `mean` leaves a constant target with a tiny non-zero spread.
    let noise = actual.len() as f64 * (4.0 * f64::EPSILON * mean.abs()).powi(2);
    if ss_tot <= noise {
        return if ss_res <= noise {
            Ok(1.0)
        } else {
            Err(ModelError::UndefinedR2 { ss_res })
        };
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// Goodness-of-fit of one model on one table.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EvaluationMetrics {
    /// Coefficient of determination.
    pub r2: f64,
    /// Mean squared error.
    pub mse: f64,
    /// Root mean squared error, in target units.
    pub rmse: f64,
    /// Number of rows scored.
    pub n_samples: usize,
}

impl EvaluationMetrics {
    /// Score `predicted` against `actual`.
    ///
    /// # Errors
    ///
    /// Same as [`r2_score`].
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Result<Self, ModelError> {
        let r2 = r2_score(actual, predicted)?;
        let mse = mean_squared_error(actual, predicted)?;
        Ok(Self {
            r2,
            mse,
            rmse: mse.sqrt(),
            n_samples: actual.len(),
        })
    }

    /// Return `true` if R² reaches `threshold`.
    #[must_use]
    pub fn meets(&self, threshold: f64) -> bool {
        self.r2 >= threshold
    }
}

/// Metrics plus the aligned series they were computed from.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Evaluation {
    /// Summary scores.
    pub metrics: EvaluationMetrics,
    /// Target values, in table row order.
    pub actual: Vec<f64>,
    /// Model predictions, aligned with `actual`.
    pub predicted: Vec<f64>,
}

/// In-sample and out-of-sample evaluation of one model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EvaluationReport {
    /// Evaluation on the training rows.
    pub train: Evaluation,
    /// Evaluation on the held-out rows.
    pub test: Evaluation,
}

/// Predict a labeled table and score the predictions.
///
/// The model's target column is separated from `table`; the remaining
/// columns must match the model schema.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`ModelError::Frame`] (`MissingTarget`) | target column absent |
/// | [`ModelError::EmptyDataset`] | table has no rows |
/// | [`ModelError::SchemaMismatch`] | feature columns differ from the model schema |
/// | [`ModelError::UndefinedR2`] | constant target with non-zero residuals |
#[instrument(skip_all, fields(strategy = %model.strategy(), n_rows = table.n_rows()))]
pub fn evaluate(model: &Model, table: &FeatureTable) -> Result<Evaluation, ModelError> {
    let (features, actual) = table.split_target(model.target())?;
    if actual.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    let predicted = model.predict(&features)?;
    let metrics = EvaluationMetrics::compute(&actual, &predicted)?;
    info!(r2 = metrics.r2, mse = metrics.mse, "model evaluated");
    Ok(Evaluation {
        metrics,
        actual,
        predicted,
    })
}

/// Evaluate on both sides of a split, each computed independently.
///
/// # Errors
///
/// Any error of [`evaluate`] on either side.
pub fn evaluate_split(model: &Model, split: &Split) -> Result<EvaluationReport, ModelError> {
    Ok(EvaluationReport {
        train: evaluate(model, &split.train)?,
        test: evaluate(model, &split.test)?,
    })
}

#[cfg(test)]
mod tests {
    use heritage_frame::{Schema, split};

    use super::*;
    use crate::model::{Strategy, TrainerConfig, train};

    #[test]
    fn perfect_predictions() {
        let actual = [1.0, 2.0, 3.0];
        assert_eq!(r2_score(&actual, &actual).unwrap(), 1.0);
        assert_eq!(mean_squared_error(&actual, &actual).unwrap(), 0.0);
    }

    #[test]
    fn mean_prediction_scores_zero() {
        let actual = [1.0, 2.0, 3.0];
        assert!(r2_score(&actual, &[2.0, 2.0, 2.0]).unwrap().abs() < 1e-12);
        assert!((mean_squared_error(&actual, &[2.0, 2.0, 2.0]).unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn constant_target() {
        assert_eq!(r2_score(&[5.0, 5.0], &[5.0, 5.0]).unwrap(), 1.0);
        assert!(matches!(
            r2_score(&[5.0, 5.0], &[5.0, 6.0]),
            Err(ModelError::UndefinedR2 { ss_res }) if ss_res == 1.0
        ));
    }

    #[test]
    fn constant_target_with_rounding_spread() {
        let actual = [0.1; 3];
        assert_eq!(r2_score(&actual, &actual).unwrap(), 1.0);
        assert!(matches!(
            r2_score(&actual, &[0.1, 0.1, 0.2]),
            Err(ModelError::UndefinedR2 { .. })
        ));

        // A small but real spread around a large mean is still scored.
        let prices = [200_000.0, 200_000.5, 199_999.5];
        assert!(r2_score(&prices, &[200_000.0; 3]).unwrap().abs() < 1e-9);
    }

    #[test]
    fn empty_and_mismatched() {
        assert!(matches!(r2_score(&[], &[]), Err(ModelError::EmptyDataset)));
        assert!(matches!(
            mean_squared_error(&[1.0], &[1.0, 2.0]),
            Err(ModelError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn metrics_threshold() {
        let m = EvaluationMetrics::compute(&[1.0, 2.0, 3.0, 4.0], &[1.1, 1.9, 3.2, 3.9]).unwrap();
        assert!(m.meets(TARGET_R2));
        assert!((m.rmse - m.mse.sqrt()).abs() < 1e-15);
        assert_eq!(m.n_samples, 4);
    }

    fn labeled(n: usize) -> FeatureTable {
        let schema = Schema::new(vec!["x".into(), "SalePrice".into()]).unwrap();
        let rows = (0..n).map(|i| vec![i as f64, 1000.0 + 50.0 * i as f64]).collect();
        FeatureTable::new(schema, rows).unwrap()
    }

    #[test]
    fn exact_model_scores_perfectly() {
        let table = labeled(30);
        let model = train(Strategy::Linear, &table, &TrainerConfig::new()).unwrap();
        let eval = evaluate(&model, &table).unwrap();
        assert!((eval.metrics.r2 - 1.0).abs() < 1e-12);
        assert!(eval.metrics.mse < 1e-12);
        assert_eq!(eval.actual.len(), eval.predicted.len());
    }

    #[test]
    fn split_report_covers_both_sides() {
        let table = labeled(50);
        let parts = split(&table, 0.2, 42).unwrap();
        let model = train(Strategy::Linear, &parts.train, &TrainerConfig::new()).unwrap();
        let report = evaluate_split(&model, &parts).unwrap();
        assert_eq!(report.train.metrics.n_samples, 40);
        assert_eq!(report.test.metrics.n_samples, 10);
        assert_eq!(report.test.actual, parts.test.column("SalePrice").unwrap());
    }
}
