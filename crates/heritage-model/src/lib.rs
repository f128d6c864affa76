//! Regression models for house prices: train, evaluate, persist.
//!
//! Provides a strategy-tagged [`Model`] over ordinary least squares, a
//! random forest of CART regression trees trained in parallel via rayon,
//! and gradient-boosted trees. Models are scored with R² and MSE and
//! stored as versioned bincode artifacts by [`ModelStore`].

mod boost;
mod config;
mod error;
mod forest;
mod importance;
mod linear;
mod metrics;
mod model;
mod node;
mod oob;
mod predict;
mod result;
mod split;
mod store;
mod tree;

pub use boost::{GradientBoostedTrees, GradientBoostingConfig};
pub use config::{MaxFeatures, OobMode, RandomForestConfig};
pub use error::ModelError;
pub use forest::RandomForest;
pub use importance::RankedFeature;
pub use linear::LinearRegression;
pub use metrics::{
    Evaluation, EvaluationMetrics, EvaluationReport, TARGET_R2, evaluate, evaluate_split,
    mean_squared_error, r2_score,
};
pub use model::{Estimator, Model, Strategy, TrainerConfig, train};
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use oob::OobScore;
pub use result::{RandomForestResult, TrainingMetadata};
pub use store::{DEFAULT_MODEL_DIR, ModelName, ModelStore};
pub use tree::{RegressionTree, RegressionTreeConfig};
