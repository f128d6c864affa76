//! Ordered column schema shared by tables and fitted models.

use std::collections::HashSet;
use std::fmt;

use crate::error::FrameError;

/// An ordered list of unique column names.
///
/// A fitted model keeps the schema of the table it was trained on; the
/// inference aligner reshapes future inputs to match it exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    /// Create a schema from column names in order.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::DuplicateColumn`] if a name appears twice.
    pub fn new(columns: Vec<String>) -> Result<Self, FrameError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(FrameError::DuplicateColumn {
                    column: column.clone(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Return the position of `name`, if present.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Return `true` if the schema declares `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Return the column names in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.columns
    }

    /// Return the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Return `true` if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Return a copy of this schema without `name`, preserving order.
    #[must_use]
    pub fn without(&self, name: &str) -> Self {
        Self {
            columns: self.columns.iter().filter(|c| *c != name).cloned().collect(),
        }
    }

    /// Return a copy with `name` appended, or unchanged if already present.
    #[must_use]
    pub(crate) fn with_column(&self, name: &str) -> Self {
        let mut columns = self.columns.clone();
        if !self.contains(name) {
            columns.push(name.to_string());
        }
        Self { columns }
    }

    /// Iterate over column names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.columns.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn rejects_duplicate_columns() {
        let err = Schema::new(names(&["a", "b", "a"])).unwrap_err();
        assert!(matches!(err, FrameError::DuplicateColumn { ref column } if column == "a"));
    }

    #[test]
    fn position_follows_declared_order() {
        let schema = Schema::new(names(&["z", "a", "m"])).unwrap();
        assert_eq!(schema.position("z"), Some(0));
        assert_eq!(schema.position("m"), Some(2));
        assert_eq!(schema.position("q"), None);
    }

    #[test]
    fn without_preserves_order() {
        let schema = Schema::new(names(&["a", "SalePrice", "b"])).unwrap();
        assert_eq!(schema.without("SalePrice").names(), &["a", "b"]);
    }

    #[test]
    fn with_column_is_idempotent() {
        let schema = Schema::new(names(&["a"])).unwrap();
        let once = schema.with_column("TotalSF");
        let twice = once.with_column("TotalSF");
        assert_eq!(once, twice);
        assert_eq!(twice.names(), &["a", "TotalSF"]);
    }

    #[test]
    fn display_lists_columns() {
        let schema = Schema::new(names(&["a", "b"])).unwrap();
        assert_eq!(schema.to_string(), "[a, b]");
    }
}
