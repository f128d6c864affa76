use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use heritage_frame::{DEFAULT_TEST_FRACTION, FeatureTable, TARGET, clean, correlate_with_target, split};
use heritage_io::{
    PredictionRequest, PredictionResponse, RecordReader, ResultWriter, best_strategy, records_from_table,
};
use heritage_model::{
    DEFAULT_MODEL_DIR, EvaluationMetrics, ModelName, ModelStore, OobMode, Strategy, TARGET_R2, TrainerConfig,
    evaluate_split, train,
};

#[derive(Parser)]
#[command(name = "heritage")]
#[command(about = "House price modelling: clean, train, evaluate, compare and predict")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for the split and the models
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Shared model hyperparameters.
#[derive(Args, Debug, Clone)]
struct ModelArgs {
    /// Number of trees (forest) or boosting rounds
    #[arg(long, default_value_t = 100)]
    n_estimators: usize,

    /// Boosting shrinkage per round
    #[arg(long, default_value_t = 0.3)]
    learning_rate: f64,

    /// Maximum depth of boosted trees
    #[arg(long, default_value_t = 6)]
    max_depth: usize,

    /// Row fraction sampled per boosting round
    #[arg(long, default_value_t = 1.0)]
    subsample: f64,

    /// Compute the out-of-bag R² of random forests
    #[arg(long, default_value_t = false)]
    oob: bool,
}

impl ModelArgs {
    fn config(&self, seed: u64) -> TrainerConfig {
        TrainerConfig::new()
            .with_n_estimators(self.n_estimators)
            .with_learning_rate(self.learning_rate)
            .with_max_depth(self.max_depth)
            .with_subsample(self.subsample)
            .with_oob_mode(if self.oob { OobMode::Enabled } else { OobMode::Disabled })
            .with_seed(seed)
    }
}

/// Where labeled data comes from and how it is partitioned.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Path to the raw house records CSV
    #[arg(long)]
    data: PathBuf,

    /// Fraction of rows held out for testing
    #[arg(long, default_value_t = DEFAULT_TEST_FRACTION)]
    test_fraction: f64,

    /// Directory for dataset and report artifacts
    #[arg(long, default_value = "outputs/datasets")]
    output_dir: PathBuf,

    /// Run name prefixing every artifact (must match [a-zA-Z0-9_-]+)
    #[arg(long, default_value = "house_prices")]
    run: String,
}

#[derive(Subcommand)]
enum Command {
    /// Clean raw house records and write the feature table as CSV
    Clean {
        /// Path to the raw house records CSV
        #[arg(long)]
        data: PathBuf,

        /// Directory for the cleaned table
        #[arg(long, default_value = "outputs/datasets")]
        output_dir: PathBuf,

        /// Run name prefixing the output file
        #[arg(long, default_value = "house_prices")]
        run: String,
    },

    /// Train one model, evaluate it on a held-out split and save it
    Train {
        #[command(flatten)]
        data: DataArgs,

        /// Model strategy: "linear", "random-forest" or "gradient-boosted"
        #[arg(long, default_value = "gradient-boosted")]
        strategy: String,

        /// Name to save the model under (defaults to the strategy name)
        #[arg(long)]
        name: Option<String>,

        /// Directory holding model artifacts
        #[arg(long, default_value = DEFAULT_MODEL_DIR)]
        model_dir: PathBuf,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Re-evaluate a saved model on a fresh split of labeled data
    Evaluate {
        #[command(flatten)]
        data: DataArgs,

        /// Name of the saved model
        #[arg(long)]
        model: String,

        /// Directory holding model artifacts
        #[arg(long, default_value = DEFAULT_MODEL_DIR)]
        model_dir: PathBuf,
    },

    /// Train every strategy on the same split and report them side by side
    Compare {
        #[command(flatten)]
        data: DataArgs,

        /// Save the model with the best test R² under this name
        #[arg(long)]
        save_best: Option<String>,

        /// Directory holding model artifacts
        #[arg(long, default_value = DEFAULT_MODEL_DIR)]
        model_dir: PathBuf,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Predict sale prices with a saved model
    Predict {
        /// Name of the saved model
        #[arg(long)]
        model: String,

        /// Directory holding model artifacts
        #[arg(long, default_value = DEFAULT_MODEL_DIR)]
        model_dir: PathBuf,

        /// JSON request file: one record object or an array of them
        #[arg(long, conflicts_with = "data", required_unless_present = "data")]
        request: Option<PathBuf>,

        /// CSV of houses to price
        #[arg(long)]
        data: Option<PathBuf>,

        /// Clean the CSV records before predicting (raw categorical input)
        #[arg(long, default_value_t = false, requires = "data")]
        clean: bool,

        /// Directory for the predictions file
        #[arg(long, default_value = "outputs/predictions")]
        output_dir: PathBuf,

        /// Run name prefixing the output file
        #[arg(long, default_value = "house_prices")]
        run: String,
    },

    /// Correlate every cleaned feature with the sale price
    Study {
        /// Path to the raw house records CSV
        #[arg(long)]
        data: PathBuf,

        /// Directory for the study report
        #[arg(long, default_value = "outputs/datasets")]
        output_dir: PathBuf,

        /// Run name prefixing the output file
        #[arg(long, default_value = "house_prices")]
        run: String,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct CleanOutput {
    run: String,
    n_rows: usize,
    n_columns: usize,
    path: PathBuf,
}

#[derive(Serialize)]
struct TrainOutput {
    run: String,
    model: String,
    strategy: Strategy,
    n_train: usize,
    n_test: usize,
    n_features: usize,
    train: EvaluationMetrics,
    test: EvaluationMetrics,
    meets_target: bool,
    oob_r2: Option<f64>,
    model_path: PathBuf,
}

#[derive(Serialize)]
struct EvaluateOutput {
    run: String,
    model: String,
    strategy: Strategy,
    train: EvaluationMetrics,
    test: EvaluationMetrics,
    meets_target: bool,
}

#[derive(Serialize)]
struct CompareOutput {
    run: String,
    best: Option<Strategy>,
    results: Vec<CompareEntry>,
    saved: Option<PathBuf>,
}

#[derive(Serialize)]
struct CompareEntry {
    strategy: Strategy,
    train_r2: f64,
    test_r2: f64,
    test_rmse: f64,
}

#[derive(Serialize)]
struct PredictOutput {
    run: String,
    model: String,
    strategy: Strategy,
    predictions: PredictionResponse,
}

#[derive(Serialize)]
struct StudyOutput {
    run: String,
    n_rows: usize,
    top: Vec<(String, Option<f64>)>,
}

fn read_clean(path: &Path) -> Result<FeatureTable> {
    let raw = RecordReader::new(path)
        .read()
        .with_context(|| format!("failed to read {}", path.display()))?;
    let table = clean(&raw).context("failed to clean house records")?;
    info!(n_rows = table.n_rows(), n_columns = table.n_columns(), "records cleaned");
    Ok(table)
}

fn parse_run(run: &str) -> Result<ModelName> {
    run.parse().with_context(|| format!("invalid run name {run:?}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Clean { data, output_dir, run } => {
            let writer = ResultWriter::new(&output_dir, parse_run(&run)?)?;
            let table = read_clean(&data)?;
            let path = writer.write_table("cleaned", &table)?;

            print_json(&CleanOutput {
                run,
                n_rows: table.n_rows(),
                n_columns: table.n_columns(),
                path,
            })?;
        }

        Command::Train {
            data,
            strategy,
            name,
            model_dir,
            model: model_args,
        } => {
            let strategy: Strategy = strategy.parse()?;
            let name = name.unwrap_or_else(|| strategy.as_str().to_string());
            let writer = ResultWriter::new(&data.output_dir, parse_run(&data.run)?)?;

            // 1. Clean and partition
            let table = read_clean(&data.data)?;
            let parts = split(&table, data.test_fraction, cli.seed).context("failed to split dataset")?;
            writer.write_table("cleaned", &table)?;
            writer.write_table("train", &parts.train)?;
            writer.write_table("test", &parts.test)?;

            // 2. Fit on the training rows only
            let model = train(strategy, &parts.train, &model_args.config(cli.seed))
                .with_context(|| format!("failed to train {strategy} model"))?;

            // 3. Score both sides
            let report = evaluate_split(&model, &parts).context("evaluation failed")?;
            writer.write_evaluation(&model, &report)?;
            let meets_target = report.test.metrics.meets(TARGET_R2);
            if !meets_target {
                warn!(r2 = report.test.metrics.r2, target = TARGET_R2, "test R² below target");
            }

            // 4. Persist
            let model_path = ModelStore::new(&model_dir)
                .save(&model, &name)
                .context("failed to save model")?;

            print_json(&TrainOutput {
                run: data.run,
                model: name,
                strategy,
                n_train: parts.train.n_rows(),
                n_test: parts.test.n_rows(),
                n_features: model.schema().len(),
                train: report.train.metrics,
                test: report.test.metrics,
                meets_target,
                oob_r2: model.oob_r2(),
                model_path,
            })?;
        }

        Command::Evaluate {
            data,
            model: name,
            model_dir,
        } => {
            let model = ModelStore::new(&model_dir)
                .load(&name)
                .with_context(|| format!("model {name:?} is unavailable"))?;
            info!(strategy = %model.strategy(), n_features = model.schema().len(), "model loaded");

            let table = read_clean(&data.data)?;
            let parts = split(&table, data.test_fraction, cli.seed).context("failed to split dataset")?;
            let report = evaluate_split(&model, &parts).context("evaluation failed")?;

            let writer = ResultWriter::new(&data.output_dir, parse_run(&data.run)?)?;
            writer.write_evaluation(&model, &report)?;

            print_json(&EvaluateOutput {
                run: data.run,
                model: name,
                strategy: model.strategy(),
                train: report.train.metrics,
                test: report.test.metrics,
                meets_target: report.test.metrics.meets(TARGET_R2),
            })?;
        }

        Command::Compare {
            data,
            save_best,
            model_dir,
            model: model_args,
        } => {
            let writer = ResultWriter::new(&data.output_dir, parse_run(&data.run)?)?;
            let table = read_clean(&data.data)?;
            let parts = split(&table, data.test_fraction, cli.seed).context("failed to split dataset")?;
            let config = model_args.config(cli.seed);

            let mut models = Vec::with_capacity(Strategy::ALL.len());
            let mut reports = Vec::with_capacity(Strategy::ALL.len());
            for strategy in Strategy::ALL {
                let model = train(strategy, &parts.train, &config)
                    .with_context(|| format!("failed to train {strategy} model"))?;
                let report = evaluate_split(&model, &parts)
                    .with_context(|| format!("failed to evaluate {strategy} model"))?;
                info!(%strategy, test_r2 = report.test.metrics.r2, "strategy scored");
                models.push(model);
                reports.push((strategy, report));
            }
            writer.write_comparison(&reports)?;

            let best = best_strategy(&reports);
            let saved = match (&save_best, best) {
                (Some(name), Some(strategy)) => {
                    let model = models
                        .iter()
                        .find(|m| m.strategy() == strategy)
                        .context("best model missing from comparison")?;
                    let path = ModelStore::new(&model_dir)
                        .save(model, name)
                        .context("failed to save best model")?;
                    Some(path)
                }
                _ => None,
            };

            print_json(&CompareOutput {
                run: data.run,
                best,
                results: reports
                    .iter()
                    .map(|(strategy, report)| CompareEntry {
                        strategy: *strategy,
                        train_r2: report.train.metrics.r2,
                        test_r2: report.test.metrics.r2,
                        test_rmse: report.test.metrics.rmse,
                    })
                    .collect(),
                saved,
            })?;
        }

        Command::Predict {
            model: name,
            model_dir,
            request,
            data,
            clean: clean_first,
            output_dir,
            run,
        } => {
            let model = ModelStore::new(&model_dir)
                .load(&name)
                .with_context(|| format!("model {name:?} is unavailable"))?;
            info!(strategy = %model.strategy(), "model loaded");

            let predictions = match (request, data) {
                (Some(path), _) => {
                    let body = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read request {}", path.display()))?;
                    PredictionRequest::from_json(&body)?
                        .predict(&model)
                        .context("prediction failed")?
                }
                (None, Some(path)) => {
                    let raw = RecordReader::new(&path)
                        .read()
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    let values = if clean_first {
                        let table = clean(&raw).context("failed to clean house records")?;
                        model.predict(&table.reindex(model.schema()))?
                    } else {
                        model.predict_records(&records_from_table(&raw)?)?
                    };
                    PredictionResponse::Batch(values)
                }
                (None, None) => anyhow::bail!("either --request or --data is required"),
            };

            let writer = ResultWriter::new(&output_dir, parse_run(&run)?)?;
            writer.write_predictions(&name, predictions.values())?;

            print_json(&PredictOutput {
                run,
                model: name,
                strategy: model.strategy(),
                predictions,
            })?;
        }

        Command::Study { data, output_dir, run } => {
            let table = read_clean(&data)?;
            let correlations = correlate_with_target(&table, TARGET).context("correlation study failed")?;

            let writer = ResultWriter::new(&output_dir, parse_run(&run)?)?;
            writer.write_study(TARGET, table.n_rows(), &correlations)?;

            print_json(&StudyOutput {
                run,
                n_rows: table.n_rows(),
                top: correlations
                    .iter()
                    .take(10)
                    .map(|c| (c.column.clone(), c.coefficient))
                    .collect(),
            })?;
        }
    }

    Ok(())
}
