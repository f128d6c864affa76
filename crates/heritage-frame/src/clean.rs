//! Feature engineering: imputation, the `TotalSF` derived column, and
//! ordinal encoding of categorical ratings.

use tracing::{debug, info, instrument};

use crate::encoding::encoding_for;
use crate::error::FrameError;
use crate::schema::Schema;
use crate::table::{FeatureTable, RawTable, RawValue};

/// Name of the regression target column.
pub const TARGET: &str = "SalePrice";

/// Name of the derived total square footage column.
pub const TOTAL_SF: &str = "TotalSF";

/// Source columns that summed together give [`TOTAL_SF`].
pub const TOTAL_SF_PARTS: [&str; 3] = ["1stFlrSF", "2ndFlrSF", "TotalBsmtSF"];

/// Columns every raw input must carry. The target is only required for training.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "1stFlrSF",
    "2ndFlrSF",
    "TotalBsmtSF",
    "LotFrontage",
    "BedroomAbvGr",
    "GarageFinish",
    "GarageYrBlt",
    "BsmtFinType1",
    "BsmtExposure",
    "KitchenQual",
    "EnclosedPorch",
    "WoodDeckSF",
    "MasVnrArea",
];

/// How absent values in a column are filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Imputation {
    /// Replace with `0`.
    Zero,
    /// Replace with the median of the observed values.
    Median,
    /// Replace with the most frequent observed value (smallest on ties).
    Mode,
    /// Replace with a categorical placeholder label.
    Sentinel(&'static str),
}

/// Fill strategy per column. Columns not listed must be fully populated.
pub const IMPUTATION_RULES: &[(&str, Imputation)] = &[
    ("EnclosedPorch", Imputation::Zero),
    ("WoodDeckSF", Imputation::Zero),
    ("LotFrontage", Imputation::Median),
    ("GarageFinish", Imputation::Sentinel("No Garage")),
    ("GarageYrBlt", Imputation::Zero),
    ("BsmtFinType1", Imputation::Sentinel("No Basement")),
    ("BsmtExposure", Imputation::Sentinel("No Exposure")),
    ("BedroomAbvGr", Imputation::Mode),
    ("2ndFlrSF", Imputation::Zero),
    ("MasVnrArea", Imputation::Zero),
];

/// Look up the imputation rule for a column.
#[must_use]
pub fn imputation_for(column: &str) -> Option<Imputation> {
    IMPUTATION_RULES
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, rule)| *rule)
}

/// Clean a raw table into a fully numeric feature table.
///
/// Applies imputation, derives [`TOTAL_SF`], then ordinal-encodes the
/// categorical columns. The input is not modified. Column order follows the
/// input with `TotalSF` appended (or replaced in place when already present),
/// so cleaning an already-clean table returns an equal table.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`FrameError::MissingColumn`] | A required source column is absent |
/// | [`FrameError::UnknownCategory`] | A categorical value is outside its domain |
/// | [`FrameError::MissingCategory`] | `KitchenQual` has an absent value |
/// | [`FrameError::NonNumericValue`] | A numeric column holds text |
/// | [`FrameError::MissingValue`] | A column without a rule has an absent value |
/// | [`FrameError::NoObservedValues`] | Median/mode fill over an all-absent column |
#[instrument(skip_all, fields(n_rows = raw.n_rows(), n_columns = raw.schema().len()))]
pub fn clean(raw: &RawTable) -> Result<FeatureTable, FrameError> {
    for &required in REQUIRED_COLUMNS {
        if !raw.schema().contains(required) {
            return Err(FrameError::MissingColumn {
                column: required.to_string(),
            });
        }
    }

    let n_rows = raw.n_rows();

    // Column-major while transforming, transposed at the end.
    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(raw.schema().len() + 1);
    for (idx, name) in raw.schema().iter().enumerate() {
        let cells: Vec<&RawValue> = raw.rows().iter().map(|row| &row[idx]).collect();
        let filled = match imputation_for(name) {
            Some(rule) => impute(name, &cells, rule)?,
            None => cells.into_iter().cloned().collect(),
        };
        let values = match encoding_for(name) {
            Some(encoding) => filled
                .iter()
                .enumerate()
                .map(|(row_index, v)| encoding.encode(v, row_index))
                .collect::<Result<Vec<f64>, _>>()?,
            None => to_numbers(name, &filled)?,
        };
        columns.push(values);
    }

    let parts: Vec<&Vec<f64>> = TOTAL_SF_PARTS
        .iter()
        .filter_map(|part| raw.schema().position(part))
        .map(|pos| &columns[pos])
        .collect();
    let total_sf: Vec<f64> = (0..n_rows)
        .map(|i| parts.iter().map(|col| col[i]).sum())
        .collect();

    let schema: Schema = raw.schema().with_column(TOTAL_SF);
    match raw.schema().position(TOTAL_SF) {
        Some(pos) => columns[pos] = total_sf,
        None => columns.push(total_sf),
    }

    let rows: Vec<Vec<f64>> = (0..n_rows)
        .map(|i| columns.iter().map(|col| col[i]).collect())
        .collect();

    info!(n_rows, n_columns = schema.len(), "table cleaned");

    Ok(FeatureTable::from_parts(schema, rows))
}

/// Fill absent cells of one column according to `rule`.
fn impute(column: &str, cells: &[&RawValue], rule: Imputation) -> Result<Vec<RawValue>, FrameError> {
    let n_missing = cells.iter().filter(|v| v.is_missing()).count();
    if n_missing == 0 {
        return Ok(cells.iter().map(|&v| v.clone()).collect());
    }

    let fill = match rule {
        Imputation::Zero => RawValue::Number(0.0),
        Imputation::Median => RawValue::Number(median(column, cells)?),
        Imputation::Mode => RawValue::Number(mode(column, cells)?),
        Imputation::Sentinel(label) => RawValue::Text(label.to_string()),
    };
    debug!(column, n_missing, fill = %fill, "imputed absent values");

    Ok(cells
        .iter()
        .map(|&v| if v.is_missing() { fill.clone() } else { v.clone() })
        .collect())
}

/// Convert a column without an encoding to numbers.
fn to_numbers(column: &str, cells: &[RawValue]) -> Result<Vec<f64>, FrameError> {
    cells
        .iter()
        .enumerate()
        .map(|(row_index, cell)| match cell {
            RawValue::Number(v) => Ok(*v),
            RawValue::Text(raw) => Err(FrameError::NonNumericValue {
                column: column.to_string(),
                row_index,
                raw: raw.clone(),
            }),
            RawValue::Missing => Err(FrameError::MissingValue {
                column: column.to_string(),
                row_index,
            }),
        })
        .collect()
}

/// Collect the present numeric values of a column, sorted ascending.
fn observed_sorted(column: &str, cells: &[&RawValue]) -> Result<Vec<f64>, FrameError> {
    let mut observed = Vec::with_capacity(cells.len());
    for (row_index, cell) in cells.iter().enumerate() {
        match cell {
            RawValue::Number(v) => observed.push(*v),
            RawValue::Text(raw) => {
                return Err(FrameError::NonNumericValue {
                    column: column.to_string(),
                    row_index,
                    raw: raw.clone(),
                });
            }
            RawValue::Missing => {}
        }
    }
    if observed.is_empty() {
        return Err(FrameError::NoObservedValues {
            column: column.to_string(),
        });
    }
    observed.sort_unstable_by(f64::total_cmp);
    Ok(observed)
}

fn median(column: &str, cells: &[&RawValue]) -> Result<f64, FrameError> {
    let sorted = observed_sorted(column, cells)?;
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

fn mode(column: &str, cells: &[&RawValue]) -> Result<f64, FrameError> {
    let sorted = observed_sorted(column, cells)?;
    let mut best = sorted[0];
    let mut best_count = 0usize;
    let mut i = 0;
    while i < sorted.len() {
        let value = sorted[i];
        let run = sorted[i..].iter().take_while(|&&v| v == value).count();
        // Ascending scan with strict comparison keeps the smallest value on ties.
        if run > best_count {
            best = value;
            best_count = run;
        }
        i += run;
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &[&str] = &[
        "1stFlrSF",
        "2ndFlrSF",
        "TotalBsmtSF",
        "LotFrontage",
        "BedroomAbvGr",
        "GarageFinish",
        "GarageYrBlt",
        "BsmtFinType1",
        "BsmtExposure",
        "KitchenQual",
        "EnclosedPorch",
        "WoodDeckSF",
        "MasVnrArea",
        "SalePrice",
    ];

    fn row(cells: &[&str]) -> Vec<RawValue> {
        cells.iter().map(|c| RawValue::parse(c)).collect()
    }

    fn table(rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            HEADER.iter().map(|c| c.to_string()).collect(),
            rows.iter().map(|r| row(r)).collect(),
        )
        .unwrap()
    }

    fn sample() -> RawTable {
        table(&[
            &["1000", "500", "800", "65", "3", "RFn", "2003", "GLQ", "No", "Gd", "0", "0", "196", "208500"],
            &["1262", "", "1262", "", "3", "", "", "ALQ", "Gd", "TA", "", "298", "", "181500"],
            &["920", "866", "920", "68", "", "Fin", "2001", "", "", "Ex", "272", "", "162", "223500"],
            &["961", "756", "756", "60", "4", "Unf", "1998", "Unf", "Av", "Fa", "0", "0", "0", "140000"],
        ])
    }

    #[test]
    fn total_sf_is_sum_of_floor_areas() {
        let cleaned = clean(&sample()).unwrap();
        let total = cleaned.column(TOTAL_SF).unwrap();
        assert_eq!(total[0], 2300.0);
        // 2ndFlrSF imputed to zero before the sum.
        assert_eq!(total[1], 1262.0 + 0.0 + 1262.0);
        assert_eq!(total[2], 920.0 + 866.0 + 920.0);
        assert_eq!(cleaned.schema().names().last().map(String::as_str), Some(TOTAL_SF));
    }

    #[test]
    fn zero_fill_columns() {
        let cleaned = clean(&sample()).unwrap();
        assert_eq!(cleaned.column("2ndFlrSF").unwrap()[1], 0.0);
        assert_eq!(cleaned.column("GarageYrBlt").unwrap()[1], 0.0);
        assert_eq!(cleaned.column("EnclosedPorch").unwrap()[1], 0.0);
        assert_eq!(cleaned.column("WoodDeckSF").unwrap()[2], 0.0);
        assert_eq!(cleaned.column("MasVnrArea").unwrap()[1], 0.0);
    }

    #[test]
    fn lot_frontage_uses_median() {
        // Observed 65, 68, 60 -> median 65.
        let cleaned = clean(&sample()).unwrap();
        assert_eq!(cleaned.column("LotFrontage").unwrap()[1], 65.0);
    }

    #[test]
    fn even_count_median_is_midpoint() {
        let cells = [
            &RawValue::Number(1.0),
            &RawValue::Number(4.0),
            &RawValue::Missing,
            &RawValue::Number(2.0),
            &RawValue::Number(10.0),
        ];
        assert_eq!(median("LotFrontage", &cells).unwrap(), 3.0);
    }

    #[test]
    fn bedrooms_use_mode() {
        // Observed 3, 3, 4 -> mode 3.
        let cleaned = clean(&sample()).unwrap();
        assert_eq!(cleaned.column("BedroomAbvGr").unwrap()[2], 3.0);
    }

    #[test]
    fn mode_tie_takes_smallest() {
        let cells = [
            &RawValue::Number(4.0),
            &RawValue::Number(2.0),
            &RawValue::Number(4.0),
            &RawValue::Number(2.0),
            &RawValue::Missing,
        ];
        assert_eq!(mode("BedroomAbvGr", &cells).unwrap(), 2.0);
    }

    #[test]
    fn sentinels_encode_to_their_codes() {
        let cleaned = clean(&sample()).unwrap();
        assert_eq!(cleaned.column("GarageFinish").unwrap()[1], 0.0);
        assert_eq!(cleaned.column("BsmtFinType1").unwrap()[2], 0.0);
        assert_eq!(cleaned.column("BsmtExposure").unwrap()[2], 4.0);
    }

    #[test]
    fn categorical_columns_are_encoded() {
        let cleaned = clean(&sample()).unwrap();
        assert_eq!(cleaned.column("BsmtExposure").unwrap(), vec![0.0, 3.0, 4.0, 2.0]);
        assert_eq!(cleaned.column("KitchenQual").unwrap(), vec![2.0, 1.0, 3.0, 0.0]);
        assert_eq!(cleaned.column("GarageFinish").unwrap(), vec![2.0, 0.0, 3.0, 1.0]);
        assert_eq!(cleaned.column("BsmtFinType1").unwrap(), vec![6.0, 5.0, 0.0, 1.0]);
    }

    #[test]
    fn clean_is_idempotent() {
        let once = clean(&sample()).unwrap();
        let twice = clean(&RawTable::from(&once)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn input_table_is_untouched() {
        let raw = sample();
        let before = raw.clone();
        let _ = clean(&raw).unwrap();
        assert_eq!(raw, before);
    }

    #[test]
    fn missing_required_column_is_schema_error() {
        let raw = RawTable::new(
            vec!["1stFlrSF".into(), "SalePrice".into()],
            vec![row(&["1000", "1"])],
        )
        .unwrap();
        let err = clean(&raw).unwrap_err();
        assert!(matches!(err, FrameError::MissingColumn { ref column } if column == "2ndFlrSF"));
        assert_eq!(err.kind(), crate::ErrorKind::Schema);
    }

    #[test]
    fn target_column_is_optional() {
        let header: Vec<String> = HEADER[..HEADER.len() - 1].iter().map(|c| c.to_string()).collect();
        let raw = RawTable::new(
            header,
            vec![row(&["1000", "500", "800", "65", "3", "RFn", "2003", "GLQ", "No", "Gd", "0", "0", "196"])],
        )
        .unwrap();
        let cleaned = clean(&raw).unwrap();
        assert!(!cleaned.schema().contains(TARGET));
        assert_eq!(cleaned.column(TOTAL_SF).unwrap(), vec![2300.0]);
    }

    #[test]
    fn unmapped_category_aborts_batch() {
        let raw = table(&[
            &["1000", "500", "800", "65", "3", "RFn", "2003", "GLQ", "No", "Gd", "0", "0", "196", "1"],
            &["1000", "500", "800", "65", "3", "RFn", "2003", "GLQ", "Zz", "Gd", "0", "0", "196", "1"],
        ]);
        let err = clean(&raw).unwrap_err();
        assert!(matches!(
            err,
            FrameError::UnknownCategory { ref column, ref value }
                if column == "BsmtExposure" && value == "Zz"
        ));
    }

    #[test]
    fn absent_kitchen_quality_fails() {
        let raw = table(&[&["1000", "500", "800", "65", "3", "RFn", "2003", "GLQ", "No", "", "0", "0", "196", "1"]]);
        let err = clean(&raw).unwrap_err();
        assert!(matches!(err, FrameError::MissingCategory { ref column, .. } if column == "KitchenQual"));
    }

    #[test]
    fn absent_value_without_rule_fails() {
        let raw = table(&[&["1000", "500", "", "65", "3", "RFn", "2003", "GLQ", "No", "Gd", "0", "0", "196", "1"]]);
        let err = clean(&raw).unwrap_err();
        assert!(matches!(err, FrameError::MissingValue { ref column, row_index: 0 } if column == "TotalBsmtSF"));
    }

    #[test]
    fn text_in_numeric_column_fails() {
        let raw = table(&[&["1000", "big", "800", "65", "3", "RFn", "2003", "GLQ", "No", "Gd", "0", "0", "196", "1"]]);
        let err = clean(&raw).unwrap_err();
        assert!(matches!(err, FrameError::NonNumericValue { ref column, .. } if column == "2ndFlrSF"));
    }

    #[test]
    fn all_absent_median_column_fails() {
        let raw = table(&[&["1000", "500", "800", "", "3", "RFn", "2003", "GLQ", "No", "Gd", "0", "0", "196", "1"]]);
        let err = clean(&raw).unwrap_err();
        assert!(matches!(err, FrameError::NoObservedValues { ref column } if column == "LotFrontage"));
    }

    #[test]
    fn extra_numeric_columns_pass_through() {
        let mut header: Vec<String> = HEADER.iter().map(|c| c.to_string()).collect();
        header.insert(0, "OverallQual".into());
        let raw = RawTable::new(
            header,
            vec![row(&["7", "1000", "500", "800", "65", "3", "RFn", "2003", "GLQ", "No", "Gd", "0", "0", "196", "1"])],
        )
        .unwrap();
        let cleaned = clean(&raw).unwrap();
        assert_eq!(cleaned.schema().position("OverallQual"), Some(0));
        assert_eq!(cleaned.column("OverallQual").unwrap(), vec![7.0]);
    }

    #[test]
    fn empty_table_cleans_to_empty_table() {
        let cleaned = clean(&table(&[])).unwrap();
        assert!(cleaned.is_empty());
        assert!(cleaned.schema().contains(TOTAL_SF));
    }
}
