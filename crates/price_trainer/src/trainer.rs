//! Gradient Boosted Decision Tree (GBDT) trainer
//!
//! Squared-error boosting: the base score is the target mean, every round
//! fits a tree to `prediction - target` with unit hessians. Row and column
//! subsampling draw from an LCG seeded per tree, so a (seed, params, data)
//! triple always yields the same model.

use cropprice_core::{Hyperparameters, Model, Tree};
use tracing::{debug, trace};

use crate::cart::{CartBuilder, TreeConfig};
use crate::dataset::Dataset;
use crate::deterministic::{xxhash64_i64, LcgRng};
use crate::errors::{Result, TrainerError};

/// L2 regularisation on leaf weights
pub const DEFAULT_LAMBDA: f64 = 1.0;

/// Default training seed
pub const DEFAULT_SEED: i64 = 42;

/// GBDT trainer
#[derive(Clone, Debug)]
pub struct GbdtTrainer {
    params: Hyperparameters,
    seed: i64,
    lambda: f64,
}

impl GbdtTrainer {
    pub fn new(params: Hyperparameters) -> Self {
        Self {
            params,
            seed: DEFAULT_SEED,
            lambda: DEFAULT_LAMBDA,
        }
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    pub fn params(&self) -> &Hyperparameters {
        &self.params
    }

    /// Train a GBDT model on the given dataset
    pub fn train(&self, dataset: &Dataset) -> Result<Model> {
        self.params.validate()?;
        if dataset.is_empty() {
            return Err(TrainerError::InsufficientData("cannot train on an empty dataset".into()));
        }

        let n_samples = dataset.len();
        let feature_count = dataset.feature_count();
        let base_score = dataset.target_mean();
        let mut predictions = vec![base_score; n_samples];
        let hessians = vec![1.0; n_samples];

        let tree_config = TreeConfig {
            max_depth: self.params.max_depth,
            min_child_weight: self.params.min_child_weight,
            lambda: self.lambda,
            learning_rate: self.params.learning_rate,
        };

        let mut trees = Vec::with_capacity(self.params.n_estimators);
        for tree_idx in 0..self.params.n_estimators {
            trace!(tree = tree_idx + 1, total = self.params.n_estimators, "training tree");

            let gradients = self.calculate_gradients(&dataset.targets, &predictions);
            let mut rng = LcgRng::new(xxhash64_i64(&[tree_idx as i64], self.seed));
            let rows = self.sample_rows(&mut rng, n_samples);
            let columns = self.sample_columns(&mut rng, feature_count);

            let builder =
                CartBuilder::new(&dataset.features, &gradients, &hessians, tree_config.clone());
            let tree = builder.build(&rows, &columns);

            self.update_predictions(&tree, &dataset.features, &mut predictions)?;
            trees.push(tree);
        }

        if predictions.iter().any(|p| !p.is_finite()) {
            return Err(TrainerError::Training(format!(
                "non-finite training predictions with {}",
                self.params
            )));
        }

        let model = Model::new(trees, base_score, feature_count);
        model
            .validate()
            .map_err(|e| TrainerError::Training(e.to_string()))?;

        debug!(trees = model.num_trees(), base_score, "model trained");
        Ok(model)
    }

    /// Squared-error gradient; the hessian is constant 1
    fn calculate_gradients(&self, targets: &[f64], predictions: &[f64]) -> Vec<f64> {
        predictions
            .iter()
            .zip(targets)
            .map(|(pred, target)| pred - target)
            .collect()
    }

    /// Bernoulli row sample; never empty
    fn sample_rows(&self, rng: &mut LcgRng, n_samples: usize) -> Vec<usize> {
        if self.params.subsample >= 1.0 {
            return (0..n_samples).collect();
        }
        let rows: Vec<usize> = (0..n_samples)
            .filter(|_| rng.next_f64() < self.params.subsample)
            .collect();
        if rows.is_empty() {
            vec![rng.next_below(n_samples)]
        } else {
            rows
        }
    }

    /// `max(1, round(colsample * n))` features, ascending
    fn sample_columns(&self, rng: &mut LcgRng, feature_count: usize) -> Vec<usize> {
        if self.params.colsample_bytree >= 1.0 {
            return (0..feature_count).collect();
        }
        let keep = ((self.params.colsample_bytree * feature_count as f64).round() as usize)
            .clamp(1, feature_count.max(1));
        let mut columns: Vec<usize> = rng
            .permutation(feature_count)
            .into_iter()
            .take(keep)
            .collect();
        columns.sort_unstable();
        columns
    }

    fn update_predictions(
        &self,
        tree: &Tree,
        features: &[Vec<f64>],
        predictions: &mut [f64],
    ) -> Result<()> {
        for (pred, row) in predictions.iter_mut().zip(features) {
            *pred += tree
                .evaluate(row)
                .ok_or_else(|| TrainerError::Training("grown tree failed to evaluate".into()))?;
        }
        Ok(())
    }
}
