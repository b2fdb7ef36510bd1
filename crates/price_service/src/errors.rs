//! Inference error types

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Inference errors
///
/// Only `InvalidInput` reaches the caller as an error response; the others
/// degrade the request to the heuristic strategy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("model artifact not found: {}", .0.display())]
    ModelUnavailable(PathBuf),

    #[error("model execution failed: {0}")]
    ModelExecution(String),

    #[error("model stage timed out after {0:?}")]
    Timeout(Duration),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<::config::ConfigError> for InferenceError {
    fn from(err: ::config::ConfigError) -> Self {
        InferenceError::Config(err.to_string())
    }
}

impl InferenceError {
    /// Process exit status for a request that ended with this error
    pub fn status(&self) -> crate::request::Status {
        use crate::request::Status;
        match self {
            InferenceError::InvalidInput(_) | InferenceError::Config(_) => Status::InvalidInput,
            InferenceError::ModelUnavailable(_) => Status::Success,
            InferenceError::ModelExecution(_) | InferenceError::Timeout(_) => Status::ModelFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, InferenceError>;
