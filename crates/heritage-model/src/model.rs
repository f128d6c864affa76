//! The strategy-tagged model and the trainer that produces it.

use std::fmt;
use std::str::FromStr;

use heritage_frame::{FeatureTable, InputRecord, Schema, TARGET, align};
use tracing::{info, instrument};

use crate::boost::{GradientBoostedTrees, GradientBoostingConfig};
use crate::config::{OobMode, RandomForestConfig};
use crate::error::ModelError;
use crate::forest::RandomForest;
use crate::importance::RankedFeature;
use crate::linear::LinearRegression;

/// Regression strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Ordinary least squares.
    Linear,
    /// Bootstrap-aggregated regression trees.
    RandomForest,
    /// Gradient-boosted regression trees.
    GradientBoosted,
}

impl Strategy {
    /// Every strategy, in comparison order.
    pub const ALL: [Strategy; 3] = [Strategy::Linear, Strategy::RandomForest, Strategy::GradientBoosted];

    /// Return the canonical name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Linear => "linear",
            Strategy::RandomForest => "random-forest",
            Strategy::GradientBoosted => "gradient-boosted",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "linear" | "ols" => Ok(Strategy::Linear),
            "random-forest" | "rf" | "forest" => Ok(Strategy::RandomForest),
            "gradient-boosted" | "gbt" | "xgboost" | "boost" => Ok(Strategy::GradientBoosted),
            _ => Err(ModelError::UnknownStrategy { name: s.to_string() }),
        }
    }
}

/// Fitted parameters of one strategy.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Estimator {
    /// A fitted linear regression.
    Linear(LinearRegression),
    /// A fitted random forest.
    RandomForest(RandomForest),
    /// A fitted boosted ensemble.
    GradientBoosted(GradientBoostedTrees),
}

impl Estimator {
    /// Return the strategy tag of these parameters.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        match self {
            Estimator::Linear(_) => Strategy::Linear,
            Estimator::RandomForest(_) => Strategy::RandomForest,
            Estimator::GradientBoosted(_) => Strategy::GradientBoosted,
        }
    }

    fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        match self {
            Estimator::Linear(m) => m.predict_batch(rows),
            Estimator::RandomForest(m) => m.predict_batch(rows),
            Estimator::GradientBoosted(m) => m.predict_batch(rows),
        }
    }
}

/// A fitted model bound to the feature schema and target it was trained on.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Model {
    schema: Schema,
    target: String,
    estimator: Estimator,
    n_training_rows: usize,
    oob_r2: Option<f64>,
}

impl Model {
    /// Return the strategy tag.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.estimator.strategy()
    }

    /// Return the feature schema inputs must match.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return the target column name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Return the fitted parameters.
    #[must_use]
    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    /// Return the number of rows the model was trained on.
    #[must_use]
    pub fn n_training_rows(&self) -> usize {
        self.n_training_rows
    }

    /// Return the out-of-bag R², when it was computed at training time.
    #[must_use]
    pub fn oob_r2(&self) -> Option<f64> {
        self.oob_r2
    }

    /// Return ranked feature importances for tree ensembles.
    #[must_use]
    pub fn importances(&self) -> Option<Vec<RankedFeature>> {
        match &self.estimator {
            Estimator::Linear(_) => None,
            Estimator::RandomForest(m) => Some(m.importances()),
            Estimator::GradientBoosted(m) => Some(m.importances()),
        }
    }

    /// Predict one value per row of `table`, in row order.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ModelError::SchemaMismatch`] | the table's schema differs from the model's |
    /// | [`ModelError::NonFiniteValue`] | any feature value is NaN or infinite |
    pub fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>, ModelError> {
        if table.schema() != &self.schema {
            return Err(ModelError::SchemaMismatch {
                expected: self.schema.clone(),
                got: table.schema().clone(),
            });
        }
        for (row_index, row) in table.rows().iter().enumerate() {
            if let Some(col) = row.iter().position(|v| !v.is_finite()) {
                return Err(ModelError::NonFiniteValue {
                    column: self.schema.names()[col].clone(),
                    row_index,
                });
            }
        }
        self.estimator.predict_batch(table.rows())
    }

    /// Align flat input records to the model schema, then predict.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NonFiniteValue`] if any supplied value is NaN or
    /// infinite. Absent and extra columns never fail.
    pub fn predict_records(&self, records: &[InputRecord]) -> Result<Vec<f64>, ModelError> {
        self.predict(&align(records, &self.schema))
    }
}

/// Configuration for [`train`].
///
/// # Defaults
///
/// | Parameter           | Default                  |
/// |---------------------|--------------------------|
/// | `target`            | `"SalePrice"`            |
/// | `n_estimators`      | 100                      |
/// | `seed`              | 42                       |
/// | `learning_rate`     | 0.3 (boosting)           |
/// | `max_depth`         | 6 (boosting)             |
/// | `subsample`         | 1.0 (boosting)           |
/// | `oob_mode`          | `Disabled` (forest)      |
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    target: String,
    n_estimators: usize,
    seed: u64,
    learning_rate: f64,
    max_depth: usize,
    subsample: f64,
    oob_mode: OobMode,
}

impl TrainerConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            target: TARGET.to_string(),
            n_estimators: 100,
            seed: 42,
            learning_rate: 0.3,
            max_depth: 6,
            subsample: 1.0,
            oob_mode: OobMode::Disabled,
        }
    }

    /// Set the target column.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Set the ensemble size for tree strategies.
    #[must_use]
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the boosting learning rate.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the boosting tree depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the boosting row subsample ratio.
    #[must_use]
    pub fn with_subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample;
        self
    }

    /// Set whether the forest computes out-of-bag R².
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    /// Return the target column.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Return the ensemble size.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Fit `strategy` on a labeled table.
///
/// The target column is separated from the features; the remaining columns,
/// in order, become the model's schema.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`ModelError::Frame`] (`MissingTarget`) | the target column is absent |
/// | [`ModelError::EmptyDataset`] | the table has no rows |
/// | [`ModelError::ZeroFeatures`] | the target is the only column |
/// | [`ModelError::NonFiniteValue`] | any value is NaN or infinite |
/// | parameter variants | invalid ensemble settings in `config` |
#[instrument(skip(train_table, config), fields(n_rows = train_table.n_rows()))]
pub fn train(strategy: Strategy, train_table: &FeatureTable, config: &TrainerConfig) -> Result<Model, ModelError> {
    let (features, targets) = train_table.split_target(&config.target)?;
    if features.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    let schema = features.schema().clone();
    let rows = features.rows();
    let names = schema.names();

    let mut oob_r2 = None;
    let estimator = match strategy {
        Strategy::Linear => Estimator::Linear(LinearRegression::fit(rows, &targets, names)?),
        Strategy::RandomForest => {
            let result = RandomForestConfig::new(config.n_estimators)?
                .with_seed(config.seed)
                .with_oob_mode(config.oob_mode)
                .fit(rows, &targets, names)?;
            oob_r2 = result.oob_score().map(|s| s.r2);
            Estimator::RandomForest(result.into_forest())
        }
        Strategy::GradientBoosted => Estimator::GradientBoosted(
            GradientBoostingConfig::new(config.n_estimators)?
                .with_seed(config.seed)
                .with_learning_rate(config.learning_rate)
                .with_max_depth(config.max_depth)
                .with_subsample(config.subsample)
                .fit(rows, &targets, names)?,
        ),
    };

    info!(%strategy, n_features = schema.len(), "model trained");

    Ok(Model {
        schema,
        target: config.target.clone(),
        estimator,
        n_training_rows: features.n_rows(),
        oob_r2,
    })
}

#[cfg(test)]
mod tests {
    use heritage_frame::FrameError;

    use super::*;

    fn labeled(n: usize) -> FeatureTable {
        let schema = Schema::new(vec!["GrLivArea".into(), "OverallQual".into(), "SalePrice".into()]).unwrap();
        let rows = (0..n)
            .map(|i| {
                let area = 800.0 + (i * 37 % 200) as f64 * 10.0;
                let qual = (i % 10) as f64 + 1.0;
                vec![area, qual, 20_000.0 + 60.0 * area + 9_000.0 * qual]
            })
            .collect();
        FeatureTable::new(schema, rows).unwrap()
    }

    #[test]
    fn strategy_names_parse() {
        assert_eq!("linear".parse::<Strategy>().unwrap(), Strategy::Linear);
        assert_eq!("random_forest".parse::<Strategy>().unwrap(), Strategy::RandomForest);
        assert_eq!("XGBoost".parse::<Strategy>().unwrap(), Strategy::GradientBoosted);
        assert!(matches!("svm".parse::<Strategy>(), Err(ModelError::UnknownStrategy { .. })));
        for s in Strategy::ALL {
            assert_eq!(s.to_string().parse::<Strategy>().unwrap(), s);
        }
    }

    #[test]
    fn target_excluded_from_schema() {
        let model = train(Strategy::Linear, &labeled(40), &TrainerConfig::new()).unwrap();
        assert_eq!(model.schema().names(), &["GrLivArea", "OverallQual"]);
        assert_eq!(model.target(), "SalePrice");
        assert_eq!(model.strategy(), Strategy::Linear);
        assert_eq!(model.n_training_rows(), 40);
    }

    #[test]
    fn every_strategy_trains_and_predicts() {
        let table = labeled(60);
        let (features, _) = table.split_target("SalePrice").unwrap();
        let config = TrainerConfig::new().with_n_estimators(10);
        for strategy in Strategy::ALL {
            let model = train(strategy, &table, &config).unwrap();
            let preds = model.predict(&features).unwrap();
            assert_eq!(preds.len(), 60);
            assert_eq!(model.strategy(), strategy);
            assert_eq!(model.importances().is_some(), strategy != Strategy::Linear);
        }
    }

    #[test]
    fn missing_target_fails() {
        let config = TrainerConfig::new().with_target("Price");
        let err = train(Strategy::Linear, &labeled(5), &config).unwrap_err();
        assert!(matches!(err, ModelError::Frame(FrameError::MissingTarget { .. })));
    }

    #[test]
    fn empty_table_fails() {
        let table = labeled(0);
        let err = train(Strategy::RandomForest, &table, &TrainerConfig::new()).unwrap_err();
        assert!(matches!(err, ModelError::EmptyDataset));
    }

    #[test]
    fn schema_mismatch_rejected() {
        let model = train(Strategy::Linear, &labeled(20), &TrainerConfig::new()).unwrap();
        let wrong = FeatureTable::new(
            Schema::new(vec!["OverallQual".into(), "GrLivArea".into()]).unwrap(),
            vec![vec![5.0, 1500.0]],
        )
        .unwrap();
        assert!(matches!(model.predict(&wrong), Err(ModelError::SchemaMismatch { .. })));
        assert!(model.predict(&wrong.reindex(model.schema())).is_ok());
    }

    #[test]
    fn non_finite_input_rejected() {
        let model = train(Strategy::Linear, &labeled(20), &TrainerConfig::new()).unwrap();
        let record: InputRecord = [("GrLivArea", f64::NAN)].into_iter().collect();
        assert!(matches!(
            model.predict_records(&[record]),
            Err(ModelError::NonFiniteValue { ref column, row_index: 0 }) if column == "GrLivArea"
        ));
    }

    #[test]
    fn records_with_missing_columns_still_predict() {
        let model = train(Strategy::Linear, &labeled(30), &TrainerConfig::new()).unwrap();
        let record: InputRecord = [("GrLivArea", 1500.0), ("Unrelated", 3.0)].into_iter().collect();
        let preds = model.predict_records(&[record]).unwrap();
        // OverallQual filled with zero.
        assert!((preds[0] - (20_000.0 + 60.0 * 1500.0)).abs() < 1e-4);
    }

    #[test]
    fn forest_reports_oob_when_enabled() {
        let config = TrainerConfig::new().with_n_estimators(20).with_oob_mode(OobMode::Enabled);
        let model = train(Strategy::RandomForest, &labeled(80), &config).unwrap();
        assert!(model.oob_r2().is_some());
    }
}
