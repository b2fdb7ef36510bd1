use cropprice_core::{ArtifactError, FeatureError, ModelError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the trainer and model selection.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("training error: {0}")]
    Training(String),

    #[error("invalid hyperparameters: {0}")]
    InvalidParams(#[from] ModelError),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("feature error: {0}")]
    Feature(#[from] FeatureError),

    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, TrainerError>;
