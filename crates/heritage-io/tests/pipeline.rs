//! End-to-end integration tests: CSV -> clean -> split -> train -> evaluate
//! -> persist -> predict.

use std::fs;
use std::path::{Path, PathBuf};

use heritage_frame::{RawTable, TARGET, TOTAL_SF, clean, split};
use heritage_io::{PredictionRequest, PredictionResponse, RecordReader, ResultWriter, records_from_table};
use heritage_model::{ModelStore, Strategy, TARGET_R2, TrainerConfig, evaluate_split, train};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn cleaned_houses() -> heritage_frame::FeatureTable {
    let raw = RecordReader::new(&fixture_path("houses.csv"))
        .read()
        .expect("fixture should parse");
    clean(&raw).expect("fixture should clean")
}

#[test]
fn fixture_cleans_completely() {
    let raw = RecordReader::new(&fixture_path("houses.csv")).read().unwrap();
    assert_eq!(raw.n_rows(), 80);
    assert!(raw.rows().iter().flatten().any(|v| v.is_missing()));

    let table = clean(&raw).unwrap();
    assert_eq!(table.n_rows(), 80);
    assert_eq!(table.n_columns(), raw.schema().len() + 1);
    assert!(table.rows().iter().flatten().all(|v| v.is_finite()));

    // TotalSF is the exact sum of its parts on every row.
    let total = table.column(TOTAL_SF).unwrap();
    let parts: Vec<Vec<f64>> = ["1stFlrSF", "2ndFlrSF", "TotalBsmtSF"]
        .iter()
        .map(|c| table.column(c).unwrap())
        .collect();
    for (i, t) in total.iter().enumerate() {
        assert_eq!(*t, parts[0][i] + parts[1][i] + parts[2][i]);
    }

    // Cleaning a cleaned table changes nothing.
    assert_eq!(clean(&RawTable::from(&table)).unwrap(), table);
}

#[test]
fn train_evaluate_persist_round_trip() {
    let table = cleaned_houses();
    let parts = split(&table, 0.2, 42).unwrap();
    assert_eq!(parts.test.n_rows(), 16);
    assert_eq!(parts.train.n_rows(), 64);

    let dir = TempDir::new().unwrap();
    let store = ModelStore::new(dir.path().join("models"));
    let config = TrainerConfig::new().with_n_estimators(25);
    let (test_features, _) = parts.test.split_target(TARGET).unwrap();

    for strategy in Strategy::ALL {
        let model = train(strategy, &parts.train, &config).unwrap();
        let report = evaluate_split(&model, &parts).unwrap();
        assert_eq!(report.test.actual.len(), 16);

        let name = strategy.as_str();
        store.save(&model, name).unwrap();
        let loaded = store.load(name).unwrap();
        assert_eq!(loaded.strategy(), strategy);
        assert_eq!(
            loaded.predict(&test_features).unwrap(),
            model.predict(&test_features).unwrap(),
            "{strategy}: predictions changed after reload"
        );
    }

    let linear = store.load("linear").unwrap();
    let report = evaluate_split(&linear, &parts).unwrap();
    assert!(
        report.test.metrics.meets(TARGET_R2),
        "linear test r2 {}",
        report.test.metrics.r2
    );
    // TotalSF and GrLivArea are sums of other columns.
    let heritage_model::Estimator::Linear(ols) = linear.estimator() else {
        panic!("expected a linear estimator");
    };
    assert!(!ols.aliased().is_empty());
}

#[test]
fn artifacts_written_and_readable() {
    let table = cleaned_houses();
    let parts = split(&table, 0.2, 42).unwrap();
    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), "houses".parse().unwrap()).unwrap();

    let cleaned_path = writer.write_table("cleaned", &table).unwrap();
    writer.write_table("train", &parts.train).unwrap();
    writer.write_table("test", &parts.test).unwrap();

    // The cleaned CSV reads back and re-cleans to the same table.
    let reread = RecordReader::new(&cleaned_path).read().unwrap();
    assert_eq!(clean(&reread).unwrap(), table);

    let model = train(Strategy::GradientBoosted, &parts.train, &TrainerConfig::new().with_n_estimators(20)).unwrap();
    let report = evaluate_split(&model, &parts).unwrap();
    let path = writer.write_evaluation(&model, &report).unwrap();
    let content: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(content["strategy"], "gradient-boosted");
    assert_eq!(content["test"]["metrics"]["n_samples"], 16);
    assert!(content["feature_importances"].as_array().is_some());
}

#[test]
fn predict_inherited_houses() {
    let model = train(Strategy::Linear, &cleaned_houses(), &TrainerConfig::new()).unwrap();

    // Raw inherited records cleaned, then aligned to the model schema.
    let raw = RecordReader::new(&fixture_path("inherited.csv")).read().unwrap();
    assert!(!raw.schema().contains(TARGET));
    let cleaned = clean(&raw).unwrap();
    let predictions = model.predict(&cleaned.reindex(model.schema())).unwrap();
    assert_eq!(predictions.len(), 4);
    assert!(predictions.iter().all(|p| p.is_finite() && *p > 0.0));

    // The same houses as a JSON batch request give the same answers.
    let records = records_from_table(&RawTable::from(&cleaned)).unwrap();
    let body = serde_json::to_string(&records).unwrap();
    let response = PredictionRequest::from_json(&body).unwrap().predict(&model).unwrap();
    let PredictionResponse::Batch(batch) = response else {
        panic!("array request must produce a batch response");
    };
    assert_eq!(batch, predictions);
}

#[test]
fn partial_record_still_predicts() {
    let model = train(Strategy::RandomForest, &cleaned_houses(), &TrainerConfig::new().with_n_estimators(10)).unwrap();
    let req = PredictionRequest::from_json(r#"{"GrLivArea": 1800, "OverallQual": 8, "Unknown": 1}"#).unwrap();
    let PredictionResponse::Single(price) = req.predict(&model).unwrap() else {
        panic!("object request must produce a single response");
    };
    assert!(price.is_finite());
}
