//! Trainer configuration
//!
//! Layered as: built-in defaults, then an optional TOML file, then
//! `CROPPRICE_*` environment variables (`__` separates nested keys, e.g.
//! `CROPPRICE_BASELINE__MAX_DEPTH=4`).

use ::config::{Config, Environment, File as ConfigFile};
use cropprice_core::Hyperparameters;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{Result, TrainerError};
use crate::grid::ParamGrid;
use crate::trainer::DEFAULT_SEED;

pub const ENV_PREFIX: &str = "CROPPRICE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Seed for the split permutation and per-tree sampling
    pub seed: i64,
    /// Share of rows held out for testing, in (0, 1)
    pub test_ratio: f64,
    /// Cross-validation folds
    pub folds: usize,
    /// Worker threads for grid search; 0 uses the rayon default
    pub threads: usize,
    pub baseline: Hyperparameters,
    pub grid: ParamGrid,
    pub log_level: String,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            test_ratio: 0.2,
            folds: 5,
            threads: 0,
            baseline: Hyperparameters::default(),
            grid: ParamGrid::default(),
            log_level: "info".to_string(),
        }
    }
}

impl TrainerConfig {
    /// Load defaults, then `path` (if given), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(ConfigFile::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(TrainerError::Dataset(format!(
                "test_ratio must be in (0, 1), got {}",
                self.test_ratio
            )));
        }
        if self.folds < 2 {
            return Err(TrainerError::InsufficientData(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.folds
            )));
        }
        self.baseline.validate()?;
        Ok(())
    }
}
