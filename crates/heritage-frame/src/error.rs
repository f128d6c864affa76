//! Error types for table construction, cleaning and splitting.

/// Coarse classification of pipeline failures.
///
/// A serving layer maps these to client-error vs server-error responses
/// without inspecting individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required column is missing from an input table.
    Schema,
    /// A categorical value falls outside its ordinal domain.
    Encoding,
    /// Parameter misuse or a malformed value.
    Value,
    /// No model artifact exists under the requested name.
    NotFound,
    /// A stored model artifact cannot be decoded.
    CorruptArtifact,
    /// Filesystem or encoding failure on the host.
    Io,
}

impl ErrorKind {
    /// Return `true` when the failure was caused by the caller's input.
    #[must_use]
    pub fn is_client_error(self) -> bool {
        matches!(self, Self::Schema | Self::Encoding | Self::Value)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Schema => "schema",
            Self::Encoding => "encoding",
            Self::Value => "value",
            Self::NotFound => "not found",
            Self::CorruptArtifact => "corrupt artifact",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

/// Errors from table construction, feature engineering and splitting.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Returned when a required source column is absent from the input table.
    #[error("required column \"{column}\" is missing")]
    MissingColumn {
        /// Name of the absent column.
        column: String,
    },

    /// Returned when a header names the same column twice.
    #[error("column \"{column}\" appears more than once")]
    DuplicateColumn {
        /// The duplicated column name.
        column: String,
    },

    /// Returned when a row does not have one value per schema column.
    #[error("row {row_index} has {got} values, expected {expected}")]
    RowLengthMismatch {
        /// Zero-based index of the offending row.
        row_index: usize,
        /// Number of columns declared by the schema.
        expected: usize,
        /// Number of values in the row.
        got: usize,
    },

    /// Returned when a categorical value is outside the column's ordinal domain.
    #[error("cannot encode value \"{value}\" in column \"{column}\"")]
    UnknownCategory {
        /// The categorical column.
        column: String,
        /// The offending raw value.
        value: String,
    },

    /// Returned when a categorical column without a sentinel has an absent value.
    #[error("column \"{column}\" has no value at row {row_index} and no sentinel to fill it")]
    MissingCategory {
        /// The categorical column.
        column: String,
        /// Zero-based index of the offending row.
        row_index: usize,
    },

    /// Returned when a numeric column holds text.
    #[error("column \"{column}\" row {row_index}: \"{raw}\" is not a number")]
    NonNumericValue {
        /// The numeric column.
        column: String,
        /// Zero-based index of the offending row.
        row_index: usize,
        /// The raw text found in the cell.
        raw: String,
    },

    /// Returned when a column without an imputation rule has an absent value.
    #[error("column \"{column}\" has no value at row {row_index} and no imputation rule")]
    MissingValue {
        /// The column with the gap.
        column: String,
        /// Zero-based index of the offending row.
        row_index: usize,
    },

    /// Returned when a statistic-based imputation has nothing to compute from.
    #[error("column \"{column}\" has no observed values to impute from")]
    NoObservedValues {
        /// The column whose every value is absent.
        column: String,
    },

    /// Returned when the test fraction is not strictly between 0 and 1.
    #[error("test fraction must be in (0.0, 1.0), got {fraction}")]
    InvalidTestFraction {
        /// The invalid fraction provided.
        fraction: f64,
    },

    /// Returned when a table is too small to partition.
    #[error("cannot split a table of {n_rows} rows, need at least 2")]
    TooFewRows {
        /// Number of rows in the table.
        n_rows: usize,
    },

    /// Returned when the target column is absent from a labeled table.
    #[error("target column \"{column}\" is missing")]
    MissingTarget {
        /// Name of the expected target column.
        column: String,
    },
}

impl FrameError {
    /// Return the taxonomy kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingColumn { .. } | Self::DuplicateColumn { .. } | Self::RowLengthMismatch { .. } => {
                ErrorKind::Schema
            }
            Self::UnknownCategory { .. } | Self::MissingCategory { .. } => ErrorKind::Encoding,
            Self::NonNumericValue { .. }
            | Self::MissingValue { .. }
            | Self::NoObservedValues { .. }
            | Self::InvalidTestFraction { .. }
            | Self::TooFewRows { .. }
            | Self::MissingTarget { .. } => ErrorKind::Value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_errors_are_client_errors() {
        let err = FrameError::UnknownCategory {
            column: "BsmtExposure".into(),
            value: "Zz".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert!(err.kind().is_client_error());
    }

    #[test]
    fn artifact_kinds_are_not_client_errors() {
        assert!(!ErrorKind::NotFound.is_client_error());
        assert!(!ErrorKind::CorruptArtifact.is_client_error());
        assert!(!ErrorKind::Io.is_client_error());
    }

    #[test]
    fn message_names_column_and_value() {
        let err = FrameError::UnknownCategory {
            column: "KitchenQual".into(),
            value: "Po".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("KitchenQual"));
        assert!(msg.contains("Po"));
    }
}
