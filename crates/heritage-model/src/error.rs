use std::path::PathBuf;

use heritage_frame::{ErrorKind, FrameError, Schema};

use crate::model::Strategy;

/// Errors from model training, evaluation and persistence.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Returned when a table-level operation fails.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Returned when the training or evaluation table has zero rows.
    #[error("dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training table has zero feature columns.
    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// Zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the number of targets differs from the number of samples.
    #[error("{n_targets} target values for {n_samples} samples")]
    TargetLengthMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of target values.
        n_targets: usize,
    },

    /// Returned when a feature or target value is NaN or infinite.
    #[error("non-finite value in column \"{column}\" at row {row_index}")]
    NonFiniteValue {
        /// Column holding the value.
        column: String,
        /// Zero-based index of the offending row.
        row_index: usize,
    },

    /// Returned when a prediction table does not carry the model's schema.
    #[error("input schema {got} does not match model schema {expected}")]
    SchemaMismatch {
        /// Schema the model was trained on.
        expected: Schema,
        /// Schema of the table passed in.
        got: Schema,
    },

    /// Returned when n_trees or n_rounds is zero.
    #[error("ensemble size must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid ensemble size provided.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when bootstrap_fraction is not in (0.0, 1.0].
    #[error("bootstrap_fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidBootstrapFraction {
        /// The invalid bootstrap_fraction value provided.
        fraction: f64,
    },

    /// Returned when the boosting learning rate is not in (0.0, 1.0].
    #[error("learning_rate must be in (0.0, 1.0], got {learning_rate}")]
    InvalidLearningRate {
        /// The invalid learning rate provided.
        learning_rate: f64,
    },

    /// Returned when the boosting row subsample is not in (0.0, 1.0].
    #[error("subsample must be in (0.0, 1.0], got {subsample}")]
    InvalidSubsample {
        /// The invalid subsample ratio provided.
        subsample: f64,
    },

    /// Returned when the L2 leaf penalty is negative or non-finite.
    #[error("l2_regularization must be a finite value >= 0, got {lambda}")]
    InvalidRegularization {
        /// The invalid penalty provided.
        lambda: f64,
    },

    /// Returned when no training sample was ever out of bag.
    #[error("OOB evaluation failed: {reason}")]
    OobEvaluationFailed {
        /// Human-readable description of why OOB evaluation failed.
        reason: String,
    },

    /// Returned when the actual and predicted series differ in length.
    #[error("{actual} actual values but {predicted} predictions")]
    LengthMismatch {
        /// Number of actual values.
        actual: usize,
        /// Number of predictions.
        predicted: usize,
    },

    /// Returned when R² is requested for a constant target that the model
    /// does not reproduce exactly.
    #[error("r2 is undefined: target is constant but residual sum of squares is {ss_res}")]
    UndefinedR2 {
        /// Residual sum of squares.
        ss_res: f64,
    },

    /// Returned when a strategy name is not recognised.
    #[error("unknown strategy \"{name}\", expected one of: linear, random-forest, gradient-boosted")]
    UnknownStrategy {
        /// The unrecognised name.
        name: String,
    },

    /// Returned when a model name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid model name \"{name}\": use letters, digits, '-' or '_'")]
    InvalidModelName {
        /// The rejected name.
        name: String,
    },

    /// Returned when no artifact exists under the requested name.
    #[error("no model named \"{name}\" at {path}")]
    ModelNotFound {
        /// The requested model name.
        name: String,
        /// Where the artifact was expected.
        path: PathBuf,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },

    /// Returned when the envelope's strategy tag disagrees with the stored model.
    #[error("artifact {path} is tagged {tagged} but holds a {found} model")]
    StrategyMismatch {
        /// Path to the inconsistent artifact.
        path: PathBuf,
        /// Strategy recorded in the envelope.
        tagged: Strategy,
        /// Strategy of the decoded model.
        found: Strategy,
    },

    /// Returned when the model directory cannot be created.
    #[error("failed to create model directory {path}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when deleting the model file fails.
    #[error("failed to delete model at {path}")]
    DeleteModel {
        /// Path to the file that could not be removed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the model directory cannot be listed.
    #[error("failed to list models in {path}")]
    ListModels {
        /// The model directory.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl ModelError {
    /// Return the taxonomy kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Frame(e) => e.kind(),
            Self::FeatureCountMismatch { .. } | Self::SchemaMismatch { .. } => ErrorKind::Schema,
            Self::ModelNotFound { .. } => ErrorKind::NotFound,
            Self::DeserializeModel { .. }
            | Self::IncompatibleModelVersion { .. }
            | Self::StrategyMismatch { .. } => ErrorKind::CorruptArtifact,
            Self::SerializeModel { .. }
            | Self::CreateDir { .. }
            | Self::WriteModel { .. }
            | Self::ReadModel { .. }
            | Self::DeleteModel { .. }
            | Self::ListModels { .. } => ErrorKind::Io,
            _ => ErrorKind::Value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_keep_their_kind() {
        let err = ModelError::from(FrameError::MissingColumn {
            column: "KitchenQual".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[test]
    fn store_failures_are_not_client_errors() {
        let missing = ModelError::ModelNotFound {
            name: "m".into(),
            path: PathBuf::from("outputs/models/m.bin"),
        };
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert!(!missing.kind().is_client_error());

        let stale = ModelError::IncompatibleModelVersion {
            expected: 1,
            found: 9,
            path: PathBuf::from("m.bin"),
        };
        assert_eq!(stale.kind(), ErrorKind::CorruptArtifact);
    }

    #[test]
    fn parameter_misuse_is_value_kind() {
        assert_eq!(ModelError::EmptyDataset.kind(), ErrorKind::Value);
        assert_eq!(ModelError::UndefinedR2 { ss_res: 1.0 }.kind(), ErrorKind::Value);
    }
}
