//! I/O error types for heritage-io.

use std::path::PathBuf;

use heritage_frame::{ErrorKind, FrameError};
use heritage_model::ModelError;

/// Errors from file I/O, CSV parsing, request decoding and result writing.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of fields than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} fields, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of fields (from header).
        expected: usize,
        /// Actual number of fields in this row.
        got: usize,
    },

    /// Returned when a prediction request body is not valid JSON.
    #[error("prediction request is not valid JSON")]
    RequestJson {
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a prediction request has the wrong shape or a non-numeric value.
    #[error("malformed prediction request: {reason}")]
    MalformedRequest {
        /// What was wrong with the request.
        reason: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a CSV table cannot be written.
    #[error("cannot write CSV table {path}")]
    WriteCsv {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a result cannot be rendered as JSON.
    #[error("cannot serialize {what} as JSON")]
    SerializeJson {
        /// Which artifact was being rendered.
        what: &'static str,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a table fails validation or cleaning.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Returned when training, prediction or evaluation fails.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl IoError {
    /// Return the taxonomy kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Frame(e) => e.kind(),
            Self::Model(e) => e.kind(),
            Self::InconsistentRowLength { .. } => ErrorKind::Schema,
            Self::CsvParse { .. }
            | Self::EmptyDataset { .. }
            | Self::RequestJson { .. }
            | Self::MalformedRequest { .. } => ErrorKind::Value,
            Self::FileNotFound { .. }
            | Self::OutputDirCreate { .. }
            | Self::WriteFile { .. }
            | Self::WriteCsv { .. }
            | Self::SerializeJson { .. } => ErrorKind::Io,
        }
    }
}
