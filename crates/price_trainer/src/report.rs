//! Evaluation report written next to the trained artifact

use cropprice_core::Hyperparameters;
use serde::{Deserialize, Serialize};

use crate::grid::FailedCandidate;
use crate::metrics::RegressionMetrics;

/// Metrics of one fitted model on both partitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub params: Hyperparameters,
    pub train: RegressionMetrics,
    pub test: RegressionMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSummary {
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub features: usize,
    pub seed: i64,
    pub test_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSummary {
    pub candidates: usize,
    pub folds: usize,
    pub best_index: usize,
    pub best_params: Hyperparameters,
    /// Mean negative MSE of the winner across folds
    pub best_mean_score: f64,
    /// Mean CV score of the candidate equal to the baseline, when the grid has one
    pub baseline_candidate_score: Option<f64>,
    pub excluded: Vec<FailedCandidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub version: String,
    pub partition: PartitionSummary,
    pub baseline: ModelEvaluation,
    pub search: SearchSummary,
    pub tuned: ModelEvaluation,
    pub cv_rmse_mean: f64,
    /// Population standard deviation of fold RMSE
    pub cv_rmse_std: f64,
    /// Test RMSE reduction relative to the baseline, in percent
    pub improvement_pct: f64,
    /// Descending by importance
    pub feature_importance: Vec<FeatureImportance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_hash: Option<String>,
}

/// `(baseline - tuned) / baseline * 100`, 0 when the baseline error is 0
pub fn improvement_pct(baseline_rmse: f64, tuned_rmse: f64) -> f64 {
    if baseline_rmse == 0.0 {
        0.0
    } else {
        (baseline_rmse - tuned_rmse) / baseline_rmse * 100.0
    }
}

/// Pair names with scores and sort descending; equal scores keep name order
pub fn rank_importance(names: &[String], scores: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(scores)
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}
