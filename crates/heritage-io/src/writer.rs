//! JSON and CSV result writer for pipeline outputs.

use std::fs;
use std::path::{Path, PathBuf};

use heritage_frame::{Correlation, FeatureTable};
use heritage_model::{
    Estimator, Evaluation, EvaluationMetrics, EvaluationReport, Model, ModelName, RankedFeature, Strategy, TARGET_R2,
};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Writes pipeline artifacts for one run into an output directory.
///
/// Creates the output directory on construction if it does not exist.
/// Every file is prefixed with the run name: `{run}_cleaned.csv`,
/// `{run}_evaluate.json`, `{run}_predict.json` and so on.
pub struct ResultWriter {
    output_dir: PathBuf,
    run: ModelName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and run name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), run = %run))]
    pub fn new(output_dir: &Path, run: ModelName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            run,
        })
    }

    /// Return the path `{output_dir}/{run}_{suffix}` without writing anything.
    #[must_use]
    pub fn path_for(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}_{suffix}", self.run))
    }

    /// Write a feature table as CSV to `{run}_{label}.csv`.
    ///
    /// Values are written in shortest round-trip form, so reading the file
    /// back and cleaning it reproduces the table.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteCsv`] or [`IoError::WriteFile`] on failure.
    #[instrument(skip(self, table), fields(n_rows = table.n_rows()))]
    pub fn write_table(&self, label: &str, table: &FeatureTable) -> Result<PathBuf, IoError> {
        let path = self.path_for(&format!("{label}.csv"));
        let csv_err = |e| IoError::WriteCsv {
            path: path.clone(),
            source: e,
        };

        let mut wtr = csv::Writer::from_path(&path).map_err(csv_err)?;
        wtr.write_record(table.schema().iter()).map_err(csv_err)?;
        for row in table.rows() {
            wtr.write_record(row.iter().map(f64::to_string)).map_err(csv_err)?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "table written");
        Ok(path)
    }

    /// Write a model's evaluation to `{run}_evaluate.json`.
    ///
    /// Includes both metric sets, the aligned actual/predicted series behind
    /// them, and the model's importances or coefficients.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(strategy = %model.strategy()))]
    pub fn write_evaluation(&self, model: &Model, report: &EvaluationReport) -> Result<PathBuf, IoError> {
        let path = self.path_for("evaluate.json");

        let (intercept, coefficients, aliased) = match model.estimator() {
            Estimator::Linear(ols) => (
                Some(ols.intercept()),
                Some(
                    ols.named_coefficients()
                        .into_iter()
                        .map(|(name, coefficient)| CoefficientEntry { name, coefficient })
                        .collect(),
                ),
                Some(ols.aliased()),
            ),
            _ => (None, None, None),
        };

        let artifact = EvaluateArtifact {
            run: self.run.as_str(),
            strategy: model.strategy(),
            target: model.target(),
            n_training_rows: model.n_training_rows(),
            target_r2: TARGET_R2,
            meets_target: report.test.metrics.meets(TARGET_R2),
            oob_r2: model.oob_r2(),
            train: &report.train,
            test: &report.test,
            feature_importances: model.importances(),
            intercept,
            coefficients,
            aliased,
        };

        self.write_json(&path, "evaluation", &artifact)?;
        info!(path = %path.display(), "evaluation result written");
        Ok(path)
    }

    /// Write side-by-side metrics of several strategies to `{run}_compare.json`.
    ///
    /// The best strategy is the one with the highest test R².
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n_strategies = reports.len()))]
    pub fn write_comparison(&self, reports: &[(Strategy, EvaluationReport)]) -> Result<PathBuf, IoError> {
        let path = self.path_for("compare.json");

        let artifact = CompareArtifact {
            run: self.run.as_str(),
            target_r2: TARGET_R2,
            best: best_strategy(reports),
            results: reports
                .iter()
                .map(|(strategy, report)| CompareEntry {
                    strategy: *strategy,
                    train: report.train.metrics,
                    test: report.test.metrics,
                    meets_target: report.test.metrics.meets(TARGET_R2),
                })
                .collect(),
        };

        self.write_json(&path, "comparison", &artifact)?;
        info!(path = %path.display(), "comparison written");
        Ok(path)
    }

    /// Write predictions to `{run}_predict.json`, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n = predictions.len()))]
    pub fn write_predictions(&self, model_name: &str, predictions: &[f64]) -> Result<PathBuf, IoError> {
        let path = self.path_for("predict.json");
        let artifact = PredictArtifact {
            run: self.run.as_str(),
            model: model_name,
            n_predictions: predictions.len(),
            predictions,
        };
        self.write_json(&path, "predictions", &artifact)?;
        info!(path = %path.display(), "predictions written");
        Ok(path)
    }

    /// Write a target correlation study to `{run}_study.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_study(&self, target: &str, n_rows: usize, correlations: &[Correlation]) -> Result<PathBuf, IoError> {
        let path = self.path_for("study.json");
        let artifact = StudyArtifact {
            run: self.run.as_str(),
            target,
            n_rows,
            correlations,
        };
        self.write_json(&path, "study", &artifact)?;
        info!(path = %path.display(), "study written");
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, path: &Path, what: &'static str, value: &T) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(value).map_err(|e| IoError::SerializeJson { what, source: e })?;
        fs::write(path, json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Return the strategy with the highest test R², if any.
#[must_use]
pub fn best_strategy(reports: &[(Strategy, EvaluationReport)]) -> Option<Strategy> {
    reports
        .iter()
        .max_by(|a, b| a.1.test.metrics.r2.total_cmp(&b.1.test.metrics.r2))
        .map(|(strategy, _)| *strategy)
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct EvaluateArtifact<'a> {
    run: &'a str,
    strategy: Strategy,
    target: &'a str,
    n_training_rows: usize,
    target_r2: f64,
    meets_target: bool,
    oob_r2: Option<f64>,
    train: &'a Evaluation,
    test: &'a Evaluation,
    feature_importances: Option<Vec<RankedFeature>>,
    intercept: Option<f64>,
    coefficients: Option<Vec<CoefficientEntry<'a>>>,
    aliased: Option<Vec<&'a str>>,
}

#[derive(Serialize)]
struct CoefficientEntry<'a> {
    name: &'a str,
    coefficient: f64,
}

#[derive(Serialize)]
struct CompareArtifact<'a> {
    run: &'a str,
    target_r2: f64,
    best: Option<Strategy>,
    results: Vec<CompareEntry>,
}

#[derive(Serialize)]
struct CompareEntry {
    strategy: Strategy,
    train: EvaluationMetrics,
    test: EvaluationMetrics,
    meets_target: bool,
}

#[derive(Serialize)]
struct PredictArtifact<'a> {
    run: &'a str,
    model: &'a str,
    n_predictions: usize,
    predictions: &'a [f64],
}

#[derive(Serialize)]
struct StudyArtifact<'a> {
    run: &'a str,
    target: &'a str,
    n_rows: usize,
    correlations: &'a [Correlation],
}
