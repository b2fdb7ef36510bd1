//! Pricing strategies
//!
//! `ModelBackedStrategy` scores a trained artifact over
//! `[currentPrice, change]`; `HeuristicStrategy` applies the percent change
//! directly and cannot fail.

use cropprice_core::{ArtifactError, ModelArtifact};
use std::path::Path;
use std::sync::Arc;

use crate::errors::{InferenceError, Result};
use crate::request::{ModelTag, PredictionRequest};

/// Feature order an inference artifact must declare
pub const INFERENCE_FEATURES: [&str; 2] = ["currentPrice", "change"];

pub trait PricingStrategy: Send + Sync {
    fn tag(&self) -> ModelTag;

    fn predict(&self, request: &PredictionRequest) -> Result<i64>;
}

/// Round half to even; `None` if the result does not fit in an `i64`
pub fn round_to_i64(value: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    let rounded = value.round_ties_even();
    (rounded.is_finite() && (-LIMIT..LIMIT).contains(&rounded)).then(|| rounded as i64)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicStrategy;

impl HeuristicStrategy {
    /// `round(currentPrice * (1 + change / 100))`, or `round(currentPrice)`
    /// when that is not representable
    pub fn price(request: &PredictionRequest) -> i64 {
        let adjusted = request.current_price * (1.0 + request.change_or_zero() / 100.0);
        round_to_i64(adjusted).unwrap_or_else(|| request.current_price.round_ties_even() as i64)
    }
}

impl PricingStrategy for HeuristicStrategy {
    fn tag(&self) -> ModelTag {
        ModelTag::Fallback
    }

    fn predict(&self, request: &PredictionRequest) -> Result<i64> {
        Ok(Self::price(request))
    }
}

#[derive(Debug, Clone)]
pub struct ModelBackedStrategy {
    artifact: Arc<ModelArtifact>,
}

impl ModelBackedStrategy {
    /// Wrap an artifact; its features must be exactly `[currentPrice, change]`
    pub fn new(artifact: ModelArtifact) -> Result<Self> {
        if artifact.feature_names != INFERENCE_FEATURES {
            return Err(InferenceError::ModelExecution(format!(
                "artifact features {:?} do not match {:?}",
                artifact.feature_names, INFERENCE_FEATURES
            )));
        }
        artifact
            .validate()
            .map_err(|e| InferenceError::ModelExecution(e.to_string()))?;
        Ok(Self {
            artifact: Arc::new(artifact),
        })
    }

    /// Load from disk. A missing file is `ModelUnavailable`; anything else
    /// that stops the artifact from loading is `ModelExecution`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(InferenceError::ModelUnavailable(path.to_path_buf()));
        }
        let artifact = ModelArtifact::load(path).map_err(|e| match e {
            ArtifactError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                InferenceError::ModelUnavailable(path.to_path_buf())
            }
            other => InferenceError::ModelExecution(other.to_string()),
        })?;
        Self::new(artifact)
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }
}

impl PricingStrategy for ModelBackedStrategy {
    fn tag(&self) -> ModelTag {
        ModelTag::Xgboost
    }

    fn predict(&self, request: &PredictionRequest) -> Result<i64> {
        let features = [request.current_price, request.change_or_zero()];
        let raw = self
            .artifact
            .predict(&features)
            .map_err(|e| InferenceError::ModelExecution(e.to_string()))?;
        round_to_i64(raw).ok_or_else(|| {
            InferenceError::ModelExecution(format!(
                "model output {raw} is not a representable price"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropprice_core::{Hyperparameters, Model, Node, Tree};

    fn constant_artifact(value: f64) -> ModelArtifact {
        let tree = Tree::new(vec![Node::leaf(0, 0.0)]);
        ModelArtifact::new(
            INFERENCE_FEATURES.iter().map(|s| s.to_string()).collect(),
            "Price",
            Hyperparameters::default(),
            Model::new(vec![tree], value, 2),
        )
        .unwrap()
    }

    #[test]
    fn heuristic_applies_percent_change() {
        assert_eq!(HeuristicStrategy::price(&PredictionRequest::new(3500.0, Some(5.2))), 3682);
        assert_eq!(HeuristicStrategy::price(&PredictionRequest::new(1000.0, None)), 1000);
        assert_eq!(HeuristicStrategy::price(&PredictionRequest::new(2000.0, Some(-10.0))), 1800);
    }

    #[test]
    fn heuristic_falls_back_to_current_price() {
        let req = PredictionRequest::new(1e300, Some(1e300));
        assert_eq!(HeuristicStrategy::price(&req), i64::MAX);
        let req = PredictionRequest::new(1234.4, Some(f64::MAX));
        assert_eq!(HeuristicStrategy::price(&req), 1234);
    }

    #[test]
    fn rounding_is_half_to_even() {
        assert_eq!(round_to_i64(3684.6), Some(3685));
        assert_eq!(round_to_i64(2.5), Some(2));
        assert_eq!(round_to_i64(3.5), Some(4));
        assert_eq!(round_to_i64(f64::NAN), None);
        assert_eq!(round_to_i64(1e19), None);
    }

    #[test]
    fn model_strategy_rounds_output() {
        let strategy = ModelBackedStrategy::new(constant_artifact(3684.6)).unwrap();
        assert_eq!(strategy.predict(&PredictionRequest::new(3500.0, Some(5.2))).unwrap(), 3685);
        assert_eq!(strategy.tag(), ModelTag::Xgboost);
    }

    #[test]
    fn model_strategy_requires_inference_features() {
        let mut artifact = constant_artifact(1.0);
        artifact.feature_names = vec!["change".into(), "currentPrice".into()];
        assert!(matches!(
            ModelBackedStrategy::new(artifact),
            Err(InferenceError::ModelExecution(_))
        ));
    }

    #[test]
    fn unrepresentable_output_is_execution_error() {
        let strategy = ModelBackedStrategy::new(constant_artifact(1e300)).unwrap();
        assert!(matches!(
            strategy.predict(&PredictionRequest::new(1.0, None)),
            Err(InferenceError::ModelExecution(_))
        ));
    }
}
