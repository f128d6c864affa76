//! Reshaping inference inputs to a model's training schema.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::schema::Schema;
use crate::table::FeatureTable;

/// Value used for schema columns the input does not provide.
pub const FILL_VALUE: f64 = 0.0;

/// One flat input record: column name to numeric value.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct InputRecord(BTreeMap<String, f64>);

impl InputRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value, returning the previous one.
    pub fn insert(&mut self, column: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(column.into(), value)
    }

    /// Return a column value.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        self.0.get(column).copied()
    }

    /// Iterate over the column names present in this record.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Return the number of columns present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` if the record has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for InputRecord {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Align input records to `schema`.
///
/// The result has exactly the schema's columns in the schema's order. Schema
/// columns missing from a record are filled with [`FILL_VALUE`]; record
/// columns the schema does not declare are dropped. Never fails: malformed
/// values are left for the model to reject.
#[instrument(skip_all, fields(n_records = records.len(), n_columns = schema.len()))]
pub fn align(records: &[InputRecord], schema: &Schema) -> FeatureTable {
    let rows: Vec<Vec<f64>> = records
        .iter()
        .map(|record| {
            schema
                .iter()
                .map(|column| record.get(column).unwrap_or(FILL_VALUE))
                .collect()
        })
        .collect();

    let mut dropped: Vec<&str> = records
        .iter()
        .flat_map(InputRecord::columns)
        .filter(|c| !schema.contains(c))
        .collect();
    dropped.sort_unstable();
    dropped.dedup();
    if !dropped.is_empty() {
        debug!(?dropped, "dropped columns not in schema");
    }

    FeatureTable::from_parts(schema.clone(), rows)
}

impl FeatureTable {
    /// Reorder, add and drop columns so this table matches `schema` exactly.
    ///
    /// Same fill and drop rules as [`align`].
    #[must_use]
    pub fn reindex(&self, schema: &Schema) -> FeatureTable {
        let sources: Vec<Option<usize>> = schema.iter().map(|c| self.schema().position(c)).collect();
        let n_filled = sources.iter().filter(|s| s.is_none()).count();
        let rows = self
            .rows()
            .iter()
            .map(|row| {
                sources
                    .iter()
                    .map(|src| src.map_or(FILL_VALUE, |i| row[i]))
                    .collect()
            })
            .collect();
        debug!(n_filled, n_dropped = self.n_columns() + n_filled - schema.len(), "table reindexed");
        FeatureTable::from_parts(schema.clone(), rows)
    }
}
