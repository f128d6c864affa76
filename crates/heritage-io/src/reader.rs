//! CSV house record reader.

use std::path::{Path, PathBuf};

use heritage_frame::{RawTable, RawValue};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads raw house records from a CSV file.
///
/// Expected CSV format:
/// - Header row required, one column name per field, names unique
/// - One row per house, all rows as wide as the header
/// - Empty cells and NA tokens (`NA`, `NaN`, `null`, ...) are read as absent
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different field count than header |
/// | [`IoError::Frame`] (`DuplicateColumn`) | Header names a column twice |
pub struct RecordReader {
    path: PathBuf,
}

impl RecordReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`RawTable`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<RawTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so ragged rows reach the InconsistentRowLength check.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.parse_error(e))?;
        let columns: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();
        let expected = columns.len();
        debug!(expected, "read CSV header");

        let mut rows = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.parse_error(e))?;
            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }
            rows.push(record.iter().map(RawValue::parse).collect::<Vec<_>>());
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let n_missing = rows.iter().flatten().filter(|v| v.is_missing()).count();
        let table = RawTable::new(columns, rows)?;
        info!(
            n_rows = table.n_rows(),
            n_columns = table.schema().len(),
            n_missing,
            "records loaded"
        );
        Ok(table)
    }

    fn parse_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}
