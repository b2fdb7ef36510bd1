//! Crop price inference service
//!
//! Answers single price queries from a trained artifact, degrading to a
//! percent-change heuristic when the artifact is missing, broken or slow.

pub mod config;
pub mod errors;
pub mod request;
pub mod service;
pub mod strategy;

pub use config::{ArtifactPolicy, ServiceConfig};
pub use errors::InferenceError;
pub use request::{ModelTag, PredictionOutcome, PredictionRequest, PredictionResponse, Status};
pub use service::{InferenceService, ModelHealth};
pub use strategy::{
    round_to_i64, HeuristicStrategy, ModelBackedStrategy, PricingStrategy, INFERENCE_FEATURES,
};
