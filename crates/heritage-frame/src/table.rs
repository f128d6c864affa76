//! Raw and cleaned table types with shape guarantees.

use crate::error::FrameError;
use crate::schema::Schema;

/// Cell tokens treated as absent, matching the common CSV NA conventions.
pub const NA_TOKENS: &[&str] = &["", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "#N/A", "<NA>"];

/// One cell of a raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// No value was recorded.
    Missing,
    /// A finite number.
    Number(f64),
    /// Free text, typically a categorical rating.
    Text(String),
}

impl RawValue {
    /// Classify a raw cell.
    ///
    /// NA tokens become [`RawValue::Missing`], finite floats become
    /// [`RawValue::Number`], and everything else is kept as text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if NA_TOKENS.contains(&trimmed) {
            return Self::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Self::Number(v),
            _ => Self::Text(trimmed.to_string()),
        }
    }

    /// Return `true` for [`RawValue::Missing`].
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => f.write_str("<missing>"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A table of raw records as read from the source, values possibly absent.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    schema: Schema,
    rows: Vec<Vec<RawValue>>,
}

impl RawTable {
    /// Create a raw table from a header and row-major cells.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`FrameError::DuplicateColumn`] | A header name repeats |
    /// | [`FrameError::RowLengthMismatch`] | A row is not as wide as the header |
    pub fn new(columns: Vec<String>, rows: Vec<Vec<RawValue>>) -> Result<Self, FrameError> {
        let schema = Schema::new(columns)?;
        check_row_lengths(schema.len(), rows.iter().map(Vec::len))?;
        Ok(Self { schema, rows })
    }

    /// Return the header.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return the rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<RawValue>] {
        &self.rows
    }

    /// Return the number of records.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Return the values of one column in row order.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&RawValue>> {
        let idx = self.schema.position(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }
}

impl From<&FeatureTable> for RawTable {
    fn from(table: &FeatureTable) -> Self {
        let rows = table
            .rows
            .iter()
            .map(|row| row.iter().map(|&v| RawValue::Number(v)).collect())
            .collect();
        Self {
            schema: table.schema.clone(),
            rows,
        }
    }
}

/// A fully numeric table whose rows all follow one ordered schema.
///
/// Produced by cleaning, splitting and alignment. Rows are row-major:
/// `rows[record][column]`, with columns in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    schema: Schema,
    rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// Create a feature table, validating every row against the schema.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::RowLengthMismatch`] if any row width differs
    /// from the schema length.
    pub fn new(schema: Schema, rows: Vec<Vec<f64>>) -> Result<Self, FrameError> {
        check_row_lengths(schema.len(), rows.iter().map(Vec::len))?;
        Ok(Self { schema, rows })
    }

    /// Assemble a table whose shape is guaranteed by the caller.
    pub(crate) fn from_parts(schema: Schema, rows: Vec<Vec<f64>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == schema.len()));
        Self { schema, rows }
    }

    /// Return the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return the rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.schema.len()
    }

    /// Return `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Return one column's values in row order.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.schema.position(name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Return a new table holding the given rows, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            schema: self.schema.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Return a new table without `name`; unchanged if the column is absent.
    #[must_use]
    pub fn drop_column(&self, name: &str) -> Self {
        let Some(idx) = self.schema.position(name) else {
            return self.clone();
        };
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.remove(idx);
                row
            })
            .collect();
        Self {
            schema: self.schema.without(name),
            rows,
        }
    }

    /// Separate the target column from the feature columns.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::MissingTarget`] if `target` is not in the schema.
    pub fn split_target(&self, target: &str) -> Result<(Self, Vec<f64>), FrameError> {
        let values = self.column(target).ok_or_else(|| FrameError::MissingTarget {
            column: target.to_string(),
        })?;
        Ok((self.drop_column(target), values))
    }
}

fn check_row_lengths(
    expected: usize,
    lengths: impl Iterator<Item = usize>,
) -> Result<(), FrameError> {
    for (row_index, got) in lengths.enumerate() {
        if got != expected {
            return Err(FrameError::RowLengthMismatch {
                row_index,
                expected,
                got,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(cols: &[&str]) -> Schema {
        Schema::new(cols.iter().map(|c| c.to_string()).collect()).unwrap()
    }

    #[test]
    fn parse_classifies_cells() {
        assert_eq!(RawValue::parse(""), RawValue::Missing);
        assert_eq!(RawValue::parse("NA"), RawValue::Missing);
        assert_eq!(RawValue::parse("nan"), RawValue::Missing);
        assert_eq!(RawValue::parse(" 856 "), RawValue::Number(856.0));
        assert_eq!(RawValue::parse("Gd"), RawValue::Text("Gd".into()));
        assert_eq!(RawValue::parse("No Garage"), RawValue::Text("No Garage".into()));
    }

    #[test]
    fn raw_table_rejects_ragged_rows() {
        let err = RawTable::new(
            vec!["a".into(), "b".into()],
            vec![vec![RawValue::Number(1.0), RawValue::Missing], vec![RawValue::Missing]],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FrameError::RowLengthMismatch { row_index: 1, expected: 2, got: 1 }
        ));
    }

    #[test]
    fn feature_table_rejects_ragged_rows() {
        let err = FeatureTable::new(schema(&["a", "b"]), vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, FrameError::RowLengthMismatch { row_index: 1, .. }));
    }

    #[test]
    fn split_target_removes_column() {
        let table = FeatureTable::new(
            schema(&["a", "SalePrice", "b"]),
            vec![vec![1.0, 100.0, 2.0], vec![3.0, 200.0, 4.0]],
        )
        .unwrap();
        let (features, target) = table.split_target("SalePrice").unwrap();
        assert_eq!(features.schema().names(), &["a", "b"]);
        assert_eq!(features.rows(), &[vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(target, vec![100.0, 200.0]);
    }

    #[test]
    fn split_target_missing_column() {
        let table = FeatureTable::new(schema(&["a"]), vec![vec![1.0]]).unwrap();
        let err = table.split_target("SalePrice").unwrap_err();
        assert!(matches!(err, FrameError::MissingTarget { ref column } if column == "SalePrice"));
    }

    #[test]
    fn select_rows_keeps_order() {
        let table = FeatureTable::new(schema(&["a"]), vec![vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let picked = table.select_rows(&[2, 0]);
        assert_eq!(picked.rows(), &[vec![3.0], vec![1.0]]);
    }

    #[test]
    fn raw_from_feature_table_round_trips_values() {
        let table = FeatureTable::new(schema(&["a", "b"]), vec![vec![1.5, 2.0]]).unwrap();
        let raw = RawTable::from(&table);
        assert_eq!(raw.schema(), table.schema());
        assert_eq!(raw.rows()[0], vec![RawValue::Number(1.5), RawValue::Number(2.0)]);
    }
}
