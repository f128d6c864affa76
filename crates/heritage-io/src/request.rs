//! JSON wire format for prediction requests and responses.
//!
//! A request is either one flat record (`{"GrLivArea": 1710, ...}`) or an
//! ordered batch of them; the response mirrors that shape with one number or
//! an array of numbers in input order.

use heritage_frame::{InputRecord, RawTable, RawValue};
use heritage_model::Model;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::IoError;

/// A decoded prediction request.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionRequest {
    /// One record, answered with one prediction.
    Single(InputRecord),
    /// An ordered batch, answered with predictions in the same order.
    Batch(Vec<InputRecord>),
}

/// Predictions shaped like the request that produced them.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    /// Answer to [`PredictionRequest::Single`].
    Single(f64),
    /// Answer to [`PredictionRequest::Batch`].
    Batch(Vec<f64>),
}

impl PredictionRequest {
    /// Parse a request body.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::RequestJson`] | Body is not JSON |
    /// | [`IoError::MalformedRequest`] | Not an object or array of objects, or a value is not a finite number |
    pub fn from_json(body: &str) -> Result<Self, IoError> {
        let value: Value = serde_json::from_str(body).map_err(|e| IoError::RequestJson { source: e })?;
        Self::from_value(value)
    }

    /// Decode an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Same as [`PredictionRequest::from_json`] minus the JSON syntax case.
    pub fn from_value(value: Value) -> Result<Self, IoError> {
        match value {
            Value::Object(_) => Ok(Self::Single(record_from_value(value, None)?)),
            Value::Array(items) => {
                let records = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| record_from_value(item, Some(i)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Batch(records))
            }
            other => Err(IoError::MalformedRequest {
                reason: format!("expected an object or an array of objects, got {}", json_type(&other)),
            }),
        }
    }

    /// Return the records in request order.
    #[must_use]
    pub fn records(&self) -> &[InputRecord] {
        match self {
            Self::Single(record) => std::slice::from_ref(record),
            Self::Batch(records) => records,
        }
    }

    /// Predict every record with `model` and shape the answer like the request.
    ///
    /// Records are aligned to the model schema first, so absent columns read
    /// as zero and unknown columns are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Model`] if prediction fails.
    #[instrument(skip_all, fields(n_records = self.records().len(), strategy = %model.strategy()))]
    pub fn predict(&self, model: &Model) -> Result<PredictionResponse, IoError> {
        let records = self.records();
        if records.is_empty() {
            return Ok(PredictionResponse::Batch(Vec::new()));
        }
        let mut predictions = model.predict_records(records)?;
        debug!(n_predictions = predictions.len(), "request answered");
        Ok(match self {
            Self::Single(_) => PredictionResponse::Single(predictions.swap_remove(0)),
            Self::Batch(_) => PredictionResponse::Batch(predictions),
        })
    }
}

impl PredictionResponse {
    /// Return the predictions as a slice, in request order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::Batch(vs) => vs,
        }
    }
}

/// Turn the rows of a raw CSV table into input records.
///
/// Absent cells are left out of the record so alignment fills them.
///
/// # Errors
///
/// Returns [`IoError::MalformedRequest`] if a present cell is not numeric.
pub fn records_from_table(table: &RawTable) -> Result<Vec<InputRecord>, IoError> {
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let mut record = InputRecord::new();
            for (column, cell) in table.schema().iter().zip(row) {
                match cell {
                    RawValue::Missing => {}
                    RawValue::Number(v) => {
                        record.insert(column, *v);
                    }
                    RawValue::Text(raw) => {
                        return Err(IoError::MalformedRequest {
                            reason: format!("row {row_index}: value \"{raw}\" of \"{column}\" is not a number"),
                        });
                    }
                }
            }
            Ok(record)
        })
        .collect()
}

fn record_from_value(value: Value, index: Option<usize>) -> Result<InputRecord, IoError> {
    let at = index.map(|i| format!("record {i}: ")).unwrap_or_default();
    let Value::Object(fields) = value else {
        return Err(IoError::MalformedRequest {
            reason: format!("{at}expected an object, got {}", json_type(&value)),
        });
    };

    let mut record = InputRecord::new();
    for (column, v) in fields {
        match v.as_f64() {
            Some(x) if x.is_finite() => {
                record.insert(column, x);
            }
            _ => {
                return Err(IoError::MalformedRequest {
                    reason: format!("{at}value of \"{column}\" is not a number: {v}"),
                });
            }
        }
    }
    Ok(record)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use heritage_frame::{FeatureTable, Schema};
    use heritage_model::{Strategy, TrainerConfig, train};

    use super::*;

    fn linear_model() -> Model {
        let schema = Schema::new(vec!["GrLivArea".into(), "GarageArea".into(), "SalePrice".into()]).unwrap();
        let rows = (0..20)
            .map(|i| {
                let area = 1000.0 + 50.0 * i as f64;
                let garage = ((i * 7) % 5) as f64 * 100.0;
                vec![area, garage, 10_000.0 + 100.0 * area + 20.0 * garage]
            })
            .collect();
        let table = FeatureTable::new(schema, rows).unwrap();
        train(Strategy::Linear, &table, &TrainerConfig::new()).unwrap()
    }

    #[test]
    fn object_is_single() {
        let req = PredictionRequest::from_json(r#"{"GrLivArea": 1500, "GarageArea": 200}"#).unwrap();
        let PredictionRequest::Single(record) = &req else {
            panic!("expected single request");
        };
        assert_eq!(record.get("GrLivArea"), Some(1500.0));
        assert_eq!(req.records().len(), 1);
    }

    #[test]
    fn array_is_batch_in_order() {
        let req = PredictionRequest::from_json(r#"[{"GrLivArea": 1}, {"GrLivArea": 2}, {}]"#).unwrap();
        let records = req.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get("GrLivArea"), Some(1.0));
        assert_eq!(records[1].get("GrLivArea"), Some(2.0));
        assert!(records[2].is_empty());
    }

    #[test]
    fn non_numeric_value_fails_whole_request() {
        let result = PredictionRequest::from_json(r#"[{"GrLivArea": 1}, {"GrLivArea": "big"}]"#);
        assert!(matches!(
            result,
            Err(IoError::MalformedRequest { ref reason }) if reason.contains("record 1") && reason.contains("GrLivArea")
        ));
        assert!(PredictionRequest::from_json(r#"{"GrLivArea": null}"#).is_err());
    }

    #[test]
    fn wrong_shapes_rejected() {
        assert!(matches!(PredictionRequest::from_json("42"), Err(IoError::MalformedRequest { .. })));
        assert!(matches!(PredictionRequest::from_json("[1, 2]"), Err(IoError::MalformedRequest { .. })));
        assert!(matches!(PredictionRequest::from_json("{"), Err(IoError::RequestJson { .. })));
    }

    #[test]
    fn response_mirrors_request_shape() {
        let model = linear_model();

        let single = PredictionRequest::from_json(r#"{"GrLivArea": 1500, "GarageArea": 200}"#).unwrap();
        let PredictionResponse::Single(price) = single.predict(&model).unwrap() else {
            panic!("expected single response");
        };
        assert!((price - 164_000.0).abs() < 1e-3);

        let batch = PredictionRequest::from_json(r#"[{"GrLivArea": 1500, "GarageArea": 200}, {"GrLivArea": 1000}]"#)
            .unwrap();
        let response = batch.predict(&model).unwrap();
        assert_eq!(response.values().len(), 2);
        // GarageArea absent from the second record reads as zero.
        assert!((response.values()[1] - 110_000.0).abs() < 1e-3);
        assert_eq!(serde_json::to_value(&response).unwrap().as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn empty_batch_gives_empty_response() {
        let req = PredictionRequest::from_json("[]").unwrap();
        assert_eq!(req.predict(&linear_model()).unwrap(), PredictionResponse::Batch(vec![]));
    }

    #[test]
    fn records_from_csv_rows() {
        let table = RawTable::new(
            vec!["GrLivArea".into(), "GarageArea".into()],
            vec![
                vec![RawValue::Number(1500.0), RawValue::Missing],
                vec![RawValue::Number(900.0), RawValue::Number(300.0)],
            ],
        )
        .unwrap();
        let records = records_from_table(&table).unwrap();
        assert_eq!(records[0].get("GarageArea"), None);
        assert_eq!(records[1].get("GarageArea"), Some(300.0));

        let bad = RawTable::new(vec!["KitchenQual".into()], vec![vec![RawValue::Text("Gd".into())]]).unwrap();
        assert!(matches!(records_from_table(&bad), Err(IoError::MalformedRequest { .. })));
    }
}
