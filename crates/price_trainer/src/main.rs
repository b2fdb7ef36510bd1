//! Crop price GBDT trainer CLI
//!
//! `preprocess` fits the feature transform and writes the engineered matrix;
//! `train` runs model selection and writes the artifact and its report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cropprice_core::features::{CATEGORICAL_COLUMNS, PRICE};
use cropprice_core::{
    correlation_with_target, raw_column_outliers, value_counts, FeatureTransformer, ModelArtifact,
};
use cropprice_trainer::{
    read_raw_table, select_from_raw_csv, write_engineered_csv, Dataset, ModelSelector,
    TrainerConfig,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "price-train")]
#[command(author = "CropPrice Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic crop price model trainer", long_about = None)]
struct Args {
    /// TOML configuration file (environment variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit the feature transform and write the engineered dataset
    Preprocess {
        /// Raw CSV dataset
        #[arg(short, long)]
        input: PathBuf,

        /// Engineered CSV output
        #[arg(short, long, default_value = "data/engineered.csv")]
        output: PathBuf,

        /// Fitted categorical encoding output
        #[arg(long, default_value = "data/encoding.json")]
        encoding: PathBuf,
    },

    /// Run baseline, grid search and final evaluation
    Train {
        /// Input CSV dataset (raw unless --engineered is set)
        #[arg(short, long)]
        input: PathBuf,

        /// Input is an already engineered CSV (features then Price)
        #[arg(long)]
        engineered: bool,

        /// Output directory for model, hash and report
        #[arg(short, long, default_value = "models")]
        output: PathBuf,

        /// Override the configured seed
        #[arg(long)]
        seed: Option<i64>,

        /// Override the configured worker thread count
        #[arg(long)]
        threads: Option<usize>,
    },
}

fn init_logging(level: &str, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config =
        TrainerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.log_level, args.verbose)?;

    info!("Crop price trainer v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Preprocess {
            input,
            output,
            encoding,
        } => preprocess(&input, &output, &encoding),
        Command::Train {
            input,
            engineered,
            output,
            seed,
            threads,
        } => {
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(threads) = threads {
                config.threads = threads;
            }
            train(&input, engineered, &output, config)
        }
    }
}

fn preprocess(input: &Path, output: &Path, encoding_path: &Path) -> Result<()> {
    info!("Loading raw dataset from: {}", input.display());
    let table = read_raw_table(input).context("Failed to read dataset")?;
    info!("Loaded {} rows with {} columns", table.len(), table.columns.len());

    for column in CATEGORICAL_COLUMNS {
        if let Some(counts) = value_counts(&table, column) {
            info!("{column} value counts:");
            for (value, count) in &counts {
                info!("  {value}: {count}");
            }
        }
    }

    for entry in raw_column_outliers(&table) {
        let summary = &entry.summary;
        if summary.count > 0 {
            warn!(
                "{}: {} outliers ({:.2}%), valid range [{:.2}, {:.2}]",
                entry.column,
                summary.count,
                summary.percentage,
                summary.lower_bound,
                summary.upper_bound
            );
        }
    }

    let fitted = FeatureTransformer::new()
        .fit_transform(&table)
        .context("Failed to transform dataset")?;
    let dataset = &fitted.dataset;

    info!(
        "Engineered {} rows with {} features",
        dataset.len(),
        dataset.feature_count()
    );
    for (column, count) in &fitted.report.category_counts {
        info!("  {column}: {count} categories");
    }

    info!("Correlation with {PRICE}:");
    for entry in correlation_with_target(dataset) {
        info!("  {}: {:.4}", entry.feature, entry.correlation);
    }

    create_parent(output)?;
    write_engineered_csv(output, dataset).context("Failed to write engineered dataset")?;
    create_parent(encoding_path)?;
    let encoding_json =
        serde_json::to_string_pretty(&fitted.encoding).context("Failed to serialize encoding")?;
    fs::write(encoding_path, encoding_json).context("Failed to write encoding file")?;

    info!("✓ Preprocessing completed");
    info!("  Dataset: {}", output.display());
    info!("  Encoding: {}", encoding_path.display());
    Ok(())
}

fn train(input: &Path, engineered: bool, output: &Path, config: TrainerConfig) -> Result<()> {
    info!("Training configuration:");
    info!("  Seed: {}", config.seed);
    info!("  Test ratio: {}", config.test_ratio);
    info!("  Folds: {}", config.folds);
    info!("  Grid candidates: {}", config.grid.len());
    info!("  Baseline: {}", config.baseline);

    let mut outcome = if engineered {
        info!("Loading engineered dataset from: {}", input.display());
        let dataset = Dataset::from_csv(input).context("Failed to load dataset")?;
        ModelSelector::new(config)?.run(&dataset).context("Model selection failed")?
    } else {
        info!("Loading raw dataset from: {}", input.display());
        select_from_raw_csv(input, config).context("Model selection failed")?
    };

    fs::create_dir_all(output).context("Failed to create output directory")?;

    let model_path = output.join("model.json");
    let hash = outcome
        .artifact
        .save(&model_path)
        .context("Failed to write model artifact")?;
    outcome.report.artifact_hash = Some(hash.clone());

    let report_path = output.join("report.json");
    let report_json =
        serde_json::to_string_pretty(&outcome.report).context("Failed to serialize report")?;
    fs::write(&report_path, report_json).context("Failed to write report")?;

    info!("✓ Training completed successfully");
    info!("  Model: {}", model_path.display());
    info!("  Hash: {} ({})", ModelArtifact::hash_path(&model_path).display(), hash);
    info!("  Report: {}", report_path.display());
    info!(
        "  Test RMSE: baseline {:.2} -> tuned {:.2} ({:+.2}%)",
        outcome.report.baseline.test.rmse,
        outcome.report.tuned.test.rmse,
        outcome.report.improvement_pct
    );
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}
