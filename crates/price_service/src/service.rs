//! Inference service
//!
//! One health check decides the strategy: a loadable artifact with the
//! inference feature order selects the model, a missing artifact selects the
//! heuristic silently, and a broken artifact selects the heuristic with the
//! failure reported. Within a request the move from model to heuristic is
//! one-way.

use cropprice_core::ModelArtifact;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::{ArtifactPolicy, ServiceConfig};
use crate::errors::InferenceError;
use crate::request::{PredictionOutcome, PredictionRequest, PredictionResponse, Status};
use crate::strategy::{HeuristicStrategy, ModelBackedStrategy, PricingStrategy};

/// Outcome of the artifact health check
#[derive(Debug, Clone)]
pub enum ModelHealth {
    Available(ModelBackedStrategy),
    /// No artifact at the configured path
    Unavailable(PathBuf),
    /// Artifact present but unusable
    Broken(String),
}

impl ModelHealth {
    fn check(path: &Path) -> Self {
        match ModelBackedStrategy::load(path) {
            Ok(strategy) => {
                info!(path = %path.display(), "model artifact loaded");
                ModelHealth::Available(strategy)
            }
            Err(InferenceError::ModelUnavailable(path)) => {
                debug!(path = %path.display(), "no model artifact, using heuristic");
                ModelHealth::Unavailable(path)
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "model artifact unusable, using heuristic"
                );
                ModelHealth::Broken(err.to_string())
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ModelHealth::Available(_))
    }
}

pub struct InferenceService {
    model_path: PathBuf,
    policy: ArtifactPolicy,
    cached: RwLock<Option<Arc<ModelHealth>>>,
    heuristic: HeuristicStrategy,
}

impl InferenceService {
    pub fn new(model_path: impl Into<PathBuf>, policy: ArtifactPolicy) -> Self {
        Self {
            model_path: model_path.into(),
            policy,
            cached: RwLock::new(None),
            heuristic: HeuristicStrategy,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.model_path.clone(), config.artifact_policy)
    }

    /// Service over an in-memory artifact; the health check never touches disk
    pub fn with_artifact(artifact: ModelArtifact) -> Self {
        let health = match ModelBackedStrategy::new(artifact) {
            Ok(strategy) => ModelHealth::Available(strategy),
            Err(err) => ModelHealth::Broken(err.to_string()),
        };
        Self {
            model_path: PathBuf::new(),
            policy: ArtifactPolicy::Cached,
            cached: RwLock::new(Some(Arc::new(health))),
            heuristic: HeuristicStrategy,
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Current health, resolving it if the policy requires
    pub fn health(&self) -> Arc<ModelHealth> {
        if self.policy == ArtifactPolicy::PerRequest && !self.model_path.as_os_str().is_empty() {
            return Arc::new(ModelHealth::check(&self.model_path));
        }

        if let Some(health) = self.cached.read().as_ref() {
            return Arc::clone(health);
        }

        let mut slot = self.cached.write();
        match slot.as_ref() {
            Some(health) => Arc::clone(health),
            None => {
                let health = Arc::new(ModelHealth::check(&self.model_path));
                *slot = Some(Arc::clone(&health));
                health
            }
        }
    }

    /// Drop a cached health result so the next request re-checks the artifact
    pub fn invalidate(&self) {
        if !self.model_path.as_os_str().is_empty() {
            *self.cached.write() = None;
        }
    }

    #[instrument(skip_all, fields(current_price = request.current_price, change = ?request.change))]
    pub fn predict(&self, request: &PredictionRequest) -> PredictionOutcome {
        match &*self.health() {
            ModelHealth::Available(strategy) => match strategy.predict(request) {
                Ok(price) => Self::priced(strategy, price, None, Status::Success),
                Err(err) => {
                    warn!(error = %err, "model prediction failed, using heuristic");
                    self.fallback(request, Some(err))
                }
            },
            ModelHealth::Unavailable(_) => self.fallback(request, None),
            ModelHealth::Broken(reason) => {
                self.fallback(request, Some(InferenceError::ModelExecution(reason.clone())))
            }
        }
    }

    /// Parse and answer a raw JSON payload
    pub fn handle_payload(&self, payload: &str) -> PredictionOutcome {
        match PredictionRequest::from_json(payload) {
            Ok(request) => self.predict(&request),
            Err(err) => PredictionOutcome::invalid(err.to_string()),
        }
    }

    /// Like [`predict`](Self::predict), with the model stage bounded by
    /// `duration`. On elapse the request is answered by the heuristic.
    pub async fn predict_with_timeout(
        self: Arc<Self>,
        request: PredictionRequest,
        duration: Duration,
    ) -> PredictionOutcome {
        let service = Arc::clone(&self);
        let task_request = request.clone();
        let task = tokio::task::spawn_blocking(move || service.predict(&task_request));

        match tokio::time::timeout(duration, task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_err)) => {
                warn!(error = %join_err, "inference task failed, using heuristic");
                let err = InferenceError::ModelExecution(format!(
                    "inference task failed: {join_err}"
                ));
                self.fallback(&request, Some(err))
            }
            Err(_) => {
                warn!(timeout = ?duration, "model stage timed out, using heuristic");
                self.fallback(&request, Some(InferenceError::Timeout(duration)))
            }
        }
    }

    /// Async payload handling; invalid input is answered before any model work
    pub async fn handle_payload_with_timeout(
        self: Arc<Self>,
        payload: &str,
        duration: Duration,
    ) -> PredictionOutcome {
        match PredictionRequest::from_json(payload) {
            Ok(request) => self.predict_with_timeout(request, duration).await,
            Err(err) => PredictionOutcome::invalid(err.to_string()),
        }
    }

    /// Heuristic answer. `error` is the reason the model could not answer;
    /// `None` means no model was configured.
    fn fallback(
        &self,
        request: &PredictionRequest,
        error: Option<InferenceError>,
    ) -> PredictionOutcome {
        let price = HeuristicStrategy::price(request);
        match error {
            None => Self::priced(&self.heuristic, price, None, Status::Success),
            Some(err) => {
                let status = err.status();
                Self::priced(&self.heuristic, price, Some(err.to_string()), status)
            }
        }
    }

    fn priced(
        strategy: &dyn PricingStrategy,
        price: i64,
        details: Option<String>,
        status: Status,
    ) -> PredictionOutcome {
        PredictionOutcome {
            response: PredictionResponse::Prediction {
                predicted_price: price,
                model: strategy.tag(),
                details,
            },
            status,
        }
    }
}
