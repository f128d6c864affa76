//! Fixed ordinal encodings for the categorical housing attributes.

use crate::error::FrameError;
use crate::table::RawValue;

/// A fixed, totally ordered mapping from category labels to integer codes.
///
/// The code of a label is its position in `levels`, lowest quality first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrdinalEncoding {
    column: &'static str,
    levels: &'static [&'static str],
}

/// Basement exposure. The "No Exposure" fill value sorts above `Gd`; this
/// literal ordering is kept for compatibility with previously trained models.
pub const BSMT_EXPOSURE: OrdinalEncoding = OrdinalEncoding {
    column: "BsmtExposure",
    levels: &["No", "Mn", "Av", "Gd", "No Exposure"],
};

/// Rating of the primary finished basement area.
pub const BSMT_FIN_TYPE1: OrdinalEncoding = OrdinalEncoding {
    column: "BsmtFinType1",
    levels: &["No Basement", "Unf", "LwQ", "Rec", "BLQ", "ALQ", "GLQ"],
};

/// Interior finish of the garage.
pub const GARAGE_FINISH: OrdinalEncoding = OrdinalEncoding {
    column: "GarageFinish",
    levels: &["No Garage", "Unf", "RFn", "Fin"],
};

/// Kitchen quality. Has no fill value: an absent rating fails encoding.
pub const KITCHEN_QUAL: OrdinalEncoding = OrdinalEncoding {
    column: "KitchenQual",
    levels: &["Fa", "TA", "Gd", "Ex"],
};

/// Every categorical column the cleaner encodes.
pub const ENCODINGS: [OrdinalEncoding; 4] = [BSMT_EXPOSURE, BSMT_FIN_TYPE1, GARAGE_FINISH, KITCHEN_QUAL];

/// Look up the encoding for a column, if it is categorical.
#[must_use]
pub fn encoding_for(column: &str) -> Option<&'static OrdinalEncoding> {
    ENCODINGS.iter().find(|e| e.column == column)
}

impl OrdinalEncoding {
    /// Return the column this encoding applies to.
    #[must_use]
    pub fn column(&self) -> &'static str {
        self.column
    }

    /// Return the labels in code order.
    #[must_use]
    pub fn levels(&self) -> &'static [&'static str] {
        self.levels
    }

    /// Return the code of `label`, if it belongs to the domain.
    #[must_use]
    pub fn code_of(&self, label: &str) -> Option<usize> {
        self.levels.iter().position(|l| *l == label)
    }

    /// Return the label for `code`, if it belongs to the domain.
    #[must_use]
    pub fn label_of(&self, code: usize) -> Option<&'static str> {
        self.levels.get(code).copied()
    }

    /// Encode one cell.
    ///
    /// Labels map to their code. An integral number that is already a valid
    /// code is accepted unchanged, so encoding an encoded column is a no-op.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`FrameError::UnknownCategory`] | Label or number outside the domain |
    /// | [`FrameError::MissingCategory`] | The cell is absent |
    pub fn encode(&self, value: &RawValue, row_index: usize) -> Result<f64, FrameError> {
        match value {
            RawValue::Text(label) => self
                .code_of(label)
                .map(|code| code as f64)
                .ok_or_else(|| FrameError::UnknownCategory {
                    column: self.column.to_string(),
                    value: label.clone(),
                }),
            RawValue::Number(v) => {
                if v.fract() == 0.0 && *v >= 0.0 && (*v as usize) < self.levels.len() {
                    Ok(*v)
                } else {
                    Err(FrameError::UnknownCategory {
                        column: self.column.to_string(),
                        value: v.to_string(),
                    })
                }
            }
            RawValue::Missing => Err(FrameError::MissingCategory {
                column: self.column.to_string(),
                row_index,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    #[test]
    fn bsmt_exposure_literal_mapping() {
        let expected = [("No", 0.0), ("Mn", 1.0), ("Av", 2.0), ("Gd", 3.0), ("No Exposure", 4.0)];
        for (label, code) in expected {
            assert_eq!(BSMT_EXPOSURE.encode(&text(label), 0).unwrap(), code, "{label}");
        }
    }

    #[test]
    fn bsmt_fin_type_mapping() {
        assert_eq!(BSMT_FIN_TYPE1.encode(&text("No Basement"), 0).unwrap(), 0.0);
        assert_eq!(BSMT_FIN_TYPE1.encode(&text("Unf"), 0).unwrap(), 1.0);
        assert_eq!(BSMT_FIN_TYPE1.encode(&text("GLQ"), 0).unwrap(), 6.0);
    }

    #[test]
    fn garage_finish_mapping() {
        assert_eq!(GARAGE_FINISH.encode(&text("No Garage"), 0).unwrap(), 0.0);
        assert_eq!(GARAGE_FINISH.encode(&text("Fin"), 0).unwrap(), 3.0);
    }

    #[test]
    fn kitchen_qual_mapping() {
        assert_eq!(KITCHEN_QUAL.encode(&text("Fa"), 0).unwrap(), 0.0);
        assert_eq!(KITCHEN_QUAL.encode(&text("Ex"), 0).unwrap(), 3.0);
    }

    #[test]
    fn unknown_label_names_column_and_value() {
        let err = BSMT_EXPOSURE.encode(&text("Zz"), 3).unwrap_err();
        assert!(matches!(
            err,
            FrameError::UnknownCategory { ref column, ref value }
                if column == "BsmtExposure" && value == "Zz"
        ));
    }

    #[test]
    fn absent_kitchen_quality_fails() {
        let err = KITCHEN_QUAL.encode(&RawValue::Missing, 7).unwrap_err();
        assert!(matches!(
            err,
            FrameError::MissingCategory { ref column, row_index: 7 } if column == "KitchenQual"
        ));
    }

    #[test]
    fn valid_code_passes_through() {
        assert_eq!(BSMT_EXPOSURE.encode(&RawValue::Number(4.0), 0).unwrap(), 4.0);
        assert_eq!(KITCHEN_QUAL.encode(&RawValue::Number(0.0), 0).unwrap(), 0.0);
    }

    #[test]
    fn out_of_domain_code_fails() {
        assert!(KITCHEN_QUAL.encode(&RawValue::Number(4.0), 0).is_err());
        assert!(KITCHEN_QUAL.encode(&RawValue::Number(1.5), 0).is_err());
        assert!(KITCHEN_QUAL.encode(&RawValue::Number(-1.0), 0).is_err());
    }

    #[test]
    fn lookup_by_column() {
        assert_eq!(encoding_for("GarageFinish"), Some(&GARAGE_FINISH));
        assert_eq!(encoding_for("LotFrontage"), None);
        assert_eq!(GARAGE_FINISH.label_of(2), Some("RFn"));
    }
}
