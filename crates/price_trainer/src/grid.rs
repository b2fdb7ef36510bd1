//! Exhaustive hyperparameter grid search under k-fold cross-validation
//!
//! Candidates and folds are scored on the rayon pool that is current when
//! [`grid_search`] runs. Results are collected in enumeration order and
//! reduced sequentially, so the winner never depends on scheduling.

use cropprice_core::Hyperparameters;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cv::{k_fold, Fold};
use crate::dataset::Dataset;
use crate::errors::{Result, TrainerError};
use crate::metrics::{mean_std, mse};
use crate::trainer::GbdtTrainer;

/// Value lists per hyperparameter; the grid is their Cartesian product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub max_depth: Vec<usize>,
    pub subsample: Vec<f64>,
    pub colsample_bytree: Vec<f64>,
    pub min_child_weight: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![50, 100, 200],
            learning_rate: vec![0.01, 0.05, 0.1],
            max_depth: vec![3, 5, 7],
            subsample: vec![0.8, 1.0],
            colsample_bytree: vec![0.8, 1.0],
            min_child_weight: vec![1.0, 3.0, 5.0],
        }
    }
}

impl ParamGrid {
    pub fn len(&self) -> usize {
        self.n_estimators.len()
            * self.learning_rate.len()
            * self.max_depth.len()
            * self.subsample.len()
            * self.colsample_bytree.len()
            * self.min_child_weight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every combination, parameter names in alphabetical order with the last
    /// one varying fastest.
    pub fn candidates(&self) -> Vec<Hyperparameters> {
        let mut out = Vec::with_capacity(self.len());
        for &colsample_bytree in &self.colsample_bytree {
            for &learning_rate in &self.learning_rate {
                for &max_depth in &self.max_depth {
                    for &min_child_weight in &self.min_child_weight {
                        for &n_estimators in &self.n_estimators {
                            for &subsample in &self.subsample {
                                out.push(Hyperparameters {
                                    n_estimators,
                                    learning_rate,
                                    max_depth,
                                    subsample,
                                    colsample_bytree,
                                    min_child_weight,
                                });
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

/// Cross-validation result of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    /// Position in enumeration order
    pub index: usize,
    pub params: Hyperparameters,
    /// Validation MSE per fold
    pub fold_mse: Vec<f64>,
    /// Mean negative MSE across folds; higher is better
    pub mean_score: f64,
    pub std_score: f64,
}

impl CandidateScore {
    /// Validation RMSE per fold
    pub fn fold_rmse(&self) -> Vec<f64> {
        self.fold_mse.iter().map(|m| m.sqrt()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedCandidate {
    pub index: usize,
    pub params: Hyperparameters,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: CandidateScore,
    /// Scored candidates, in enumeration order
    pub scored: Vec<CandidateScore>,
    pub failed: Vec<FailedCandidate>,
}

/// Validation MSE of every fold for one parameter set
pub fn cross_validate(
    data: &Dataset,
    folds: &[Fold],
    params: Hyperparameters,
    seed: i64,
) -> Result<Vec<f64>> {
    folds
        .par_iter()
        .map(|fold| {
            let train = data.subset(&fold.train);
            let validation = data.subset(&fold.validation);
            let model = GbdtTrainer::new(params).with_seed(seed).train(&train)?;
            let predictions = model
                .predict_batch(&validation.features)
                .map_err(|e| TrainerError::Training(e.to_string()))?;
            let fold_mse = mse(&validation.targets, &predictions);
            if fold_mse.is_finite() {
                Ok(fold_mse)
            } else {
                Err(TrainerError::Training("non-finite validation error".into()))
            }
        })
        .collect()
}

/// Score every grid candidate with `k`-fold CV on `data` and pick the best.
///
/// A candidate whose training fails is excluded; the search fails only if no
/// candidate could be scored. Equal mean scores resolve to the earliest
/// candidate.
#[instrument(skip_all, fields(rows = data.len(), candidates = grid.len(), folds = k))]
pub fn grid_search(data: &Dataset, grid: &ParamGrid, k: usize, seed: i64) -> Result<SearchOutcome> {
    let folds = k_fold(data.len(), k)?;
    let candidates = grid.candidates();
    if candidates.is_empty() {
        return Err(TrainerError::Training("parameter grid is empty".into()));
    }
    info!(
        candidates = candidates.len(),
        fits = candidates.len() * k,
        "starting grid search"
    );

    let results: Vec<(usize, Hyperparameters, Result<Vec<f64>>)> = candidates
        .into_par_iter()
        .enumerate()
        .map(|(index, params)| (index, params, cross_validate(data, &folds, params, seed)))
        .collect();

    let mut scored = Vec::new();
    let mut failed = Vec::new();
    for (index, params, result) in results {
        match result {
            Ok(fold_mse) => {
                let neg: Vec<f64> = fold_mse.iter().map(|m| -m).collect();
                let (mean_score, std_score) = mean_std(&neg);
                debug!(index, %params, mean_score, "candidate scored");
                scored.push(CandidateScore {
                    index,
                    params,
                    fold_mse,
                    mean_score,
                    std_score,
                });
            }
            Err(err) => {
                warn!(index, %params, error = %err, "candidate excluded");
                failed.push(FailedCandidate {
                    index,
                    params,
                    reason: err.to_string(),
                });
            }
        }
    }

    let mut best: Option<&CandidateScore> = None;
    for candidate in &scored {
        if best.map_or(true, |b| candidate.mean_score > b.mean_score) {
            best = Some(candidate);
        }
    }
    let best = best.cloned().ok_or_else(|| {
        TrainerError::Training(format!("all {} grid candidates failed", failed.len()))
    })?;

    info!(
        index = best.index,
        params = %best.params,
        mean_score = best.mean_score,
        excluded = failed.len(),
        "grid search complete"
    );

    Ok(SearchOutcome { best, scored, failed })
}
