//! Crop price trainer - deterministic GBDT training and model selection
//!
//! Trains gradient boosted regression trees on the engineered crop dataset,
//! searches a hyperparameter grid under k-fold cross-validation, and packages
//! the winner as a hash-verified model artifact.

pub mod cart;
pub mod config;
pub mod cv;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod grid;
pub mod metrics;
pub mod report;
pub mod selector;
pub mod trainer;

use cropprice_core::{FeatureTransformer, FittedFeatures};
use std::path::Path;

pub use config::TrainerConfig;
pub use dataset::{read_raw_table, write_engineered_csv, Dataset, TrainTestSplit};
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use errors::TrainerError;
pub use grid::{grid_search, CandidateScore, ParamGrid, SearchOutcome};
pub use metrics::RegressionMetrics;
pub use report::EvaluationReport;
pub use selector::{ModelSelector, SelectionOutcome};
pub use trainer::GbdtTrainer;

/// Read a raw CSV and fit the feature transform on it
pub fn fit_features_from_csv(path: &Path) -> Result<FittedFeatures, TrainerError> {
    let table = read_raw_table(path)?;
    Ok(FeatureTransformer::new().fit_transform(&table)?)
}

/// Fit features on a raw CSV and run model selection.
///
/// The fitted encoding is embedded in the returned artifact.
pub fn select_from_raw_csv(
    path: &Path,
    config: TrainerConfig,
) -> Result<SelectionOutcome, TrainerError> {
    let fitted = fit_features_from_csv(path)?;
    let dataset = Dataset::from_engineered(fitted.dataset)?;
    let mut outcome = ModelSelector::new(config)?.run(&dataset)?;
    outcome.artifact = outcome.artifact.with_encoding(fitted.encoding);
    Ok(outcome)
}
