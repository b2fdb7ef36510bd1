//! Model selection: baseline, grid search, final evaluation
//!
//! 1. Seeded shuffle split into train and test partitions
//! 2. Baseline fit with the configured default hyperparameters
//! 3. Grid search with k-fold CV on the training partition only
//! 4. Refit of the winner on the full training partition, evaluated on both
//!    partitions with CV RMSE statistics and gain-based importance

use cropprice_core::{features::PRICE, Hyperparameters, Model, ModelArtifact};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{info, instrument};

use crate::config::TrainerConfig;
use crate::dataset::Dataset;
use crate::errors::{Result, TrainerError};
use crate::grid::{grid_search, SearchOutcome};
use crate::metrics::{mean_std, RegressionMetrics};
use crate::report::{
    improvement_pct, rank_importance, EvaluationReport, ModelEvaluation, PartitionSummary,
    SearchSummary,
};
use crate::trainer::GbdtTrainer;

/// Trained artifact plus the report describing how it was chosen
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub artifact: ModelArtifact,
    pub report: EvaluationReport,
}

pub struct ModelSelector {
    config: TrainerConfig,
    pool: Option<ThreadPool>,
}

impl ModelSelector {
    pub fn new(config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        let pool = if config.threads > 0 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .thread_name(|i| format!("price-train-{i}"))
                .build()
                .map_err(|e| TrainerError::Training(format!("failed to build thread pool: {e}")))?;
            Some(pool)
        } else {
            None
        };
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run the full selection pipeline on an engineered dataset
    #[instrument(skip_all, fields(rows = data.len(), features = data.feature_count()))]
    pub fn run(&self, data: &Dataset) -> Result<SelectionOutcome> {
        let cfg = &self.config;
        let split = data.split(cfg.seed, cfg.test_ratio)?;
        let (train, test) = (&split.train, &split.test);

        if test.is_empty() || train.len() < cfg.folds.max(2) {
            return Err(TrainerError::InsufficientData(format!(
                "{} rows give {} training and {} test rows; \
                 need at least {} training rows and 1 test row",
                data.len(),
                train.len(),
                test.len(),
                cfg.folds.max(2)
            )));
        }
        info!(train = train.len(), test = test.len(), seed = cfg.seed, "split dataset");

        let baseline_model = self.fit(cfg.baseline, train)?;
        let baseline = evaluate(&baseline_model, cfg.baseline, train, test)?;
        info!(
            rmse = baseline.test.rmse,
            mae = baseline.test.mae,
            r2 = baseline.test.r2,
            "baseline evaluated"
        );

        let search = self.install(|| grid_search(train, &cfg.grid, cfg.folds, cfg.seed))?;
        let SearchOutcome { best, scored, failed } = search;

        let tuned_model = self.fit(best.params, train)?;
        let tuned = evaluate(&tuned_model, best.params, train, test)?;
        let (cv_rmse_mean, cv_rmse_std) = mean_std(&best.fold_rmse());
        let improvement = improvement_pct(baseline.test.rmse, tuned.test.rmse);
        info!(
            rmse = tuned.test.rmse,
            mae = tuned.test.mae,
            r2 = tuned.test.r2,
            mape = tuned.test.mape,
            cv_rmse_mean,
            cv_rmse_std,
            improvement_pct = improvement,
            "tuned model evaluated"
        );

        let importance = rank_importance(&data.feature_names, &tuned_model.feature_importance());
        for (rank, entry) in importance.iter().take(10).enumerate() {
            info!(
                rank = rank + 1,
                feature = %entry.feature,
                importance = entry.importance,
                "feature importance"
            );
        }

        let baseline_candidate_score = scored
            .iter()
            .find(|c| c.params == cfg.baseline)
            .map(|c| c.mean_score);

        let report = EvaluationReport {
            version: cropprice_core::VERSION.to_string(),
            partition: PartitionSummary {
                rows: data.len(),
                train_rows: train.len(),
                test_rows: test.len(),
                features: data.feature_count(),
                seed: cfg.seed,
                test_ratio: cfg.test_ratio,
            },
            baseline,
            search: SearchSummary {
                candidates: scored.len() + failed.len(),
                folds: cfg.folds,
                best_index: best.index,
                best_params: best.params,
                best_mean_score: best.mean_score,
                baseline_candidate_score,
                excluded: failed,
            },
            tuned,
            cv_rmse_mean,
            cv_rmse_std,
            improvement_pct: improvement,
            feature_importance: importance,
            artifact_hash: None,
        };

        let artifact =
            ModelArtifact::new(data.feature_names.clone(), PRICE, best.params, tuned_model)?;
        Ok(SelectionOutcome { artifact, report })
    }

    fn fit(&self, params: Hyperparameters, data: &Dataset) -> Result<Model> {
        GbdtTrainer::new(params).with_seed(self.config.seed).train(data)
    }

    /// Run `op` on the configured pool, or the global one
    fn install<T: Send>(&self, op: impl FnOnce() -> T + Send) -> T {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

fn evaluate(
    model: &Model,
    params: Hyperparameters,
    train: &Dataset,
    test: &Dataset,
) -> Result<ModelEvaluation> {
    let predict = |data: &Dataset| {
        model
            .predict_batch(&data.features)
            .map_err(|e| TrainerError::Training(e.to_string()))
    };
    Ok(ModelEvaluation {
        params,
        train: RegressionMetrics::compute(&train.targets, &predict(train)?),
        test: RegressionMetrics::compute(&test.targets, &predict(test)?),
    })
}
