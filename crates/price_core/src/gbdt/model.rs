//! Gradient boosted regression model
//!
//! Prediction is `base_score + sum(tree outputs)`; the learning rate is
//! already folded into the leaf values.

use super::tree::Tree;
use crate::serde_canon::{hash_canonical_hex, to_canonical_json, CanonicalError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid hyperparameters: {0}")]
    InvalidParameters(String),

    #[error("expected {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("feature {index} is not a finite number")]
    NonFiniteInput { index: usize },

    #[error("tree {tree} could not be evaluated")]
    Evaluation { tree: usize },

    #[error("Canonical serialization error: {0}")]
    Canonical(#[from] CanonicalError),
}

/// Model format version
pub const MODEL_FORMAT_VERSION: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    pub version: i32,

    /// Initial prediction (mean of the training target)
    pub base_score: f64,

    /// Length of the feature vector the trees were grown on
    pub feature_count: usize,

    pub trees: Vec<Tree>,
}

impl Model {
    pub fn new(trees: Vec<Tree>, base_score: f64, feature_count: usize) -> Self {
        Self {
            version: MODEL_FORMAT_VERSION,
            base_score,
            feature_count,
            trees,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != MODEL_FORMAT_VERSION {
            return Err(ModelError::ValidationFailed(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }
        if !self.base_score.is_finite() {
            return Err(ModelError::ValidationFailed("base_score is not finite".into()));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|e| {
                ModelError::ValidationFailed(format!("Tree {i} validation failed: {e}"))
            })?;
            if let Some(max) = tree.max_feature_index() {
                if max >= self.feature_count {
                    return Err(ModelError::ValidationFailed(format!(
                        "Tree {i} splits on feature {max}, model has {} features",
                        self.feature_count
                    )));
                }
            }
        }

        Ok(())
    }

    /// Predict one row
    pub fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.feature_count {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.feature_count,
                actual: features.len(),
            });
        }
        if let Some(index) = features.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteInput { index });
        }

        let mut sum = self.base_score;
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            sum += tree
                .evaluate(features)
                .ok_or(ModelError::Evaluation { tree: tree_idx })?;
        }
        Ok(sum)
    }

    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Gain-based importance per feature, normalised to sum to 1.
    ///
    /// Each feature scores the mean gain of the splits that use it; features
    /// never split on score 0.
    pub fn feature_importance(&self) -> Vec<f64> {
        let mut gain = vec![0.0; self.feature_count];
        let mut splits = vec![0usize; self.feature_count];

        for node in self.trees.iter().flat_map(|t| t.nodes.iter()) {
            if node.is_leaf() {
                continue;
            }
            if let Some(idx) = usize::try_from(node.feature_idx)
                .ok()
                .filter(|&i| i < self.feature_count)
            {
                gain[idx] += node.gain;
                splits[idx] += 1;
            }
        }

        let mean: Vec<f64> = gain
            .iter()
            .zip(&splits)
            .map(|(&g, &n)| if n == 0 { 0.0 } else { g / n as f64 })
            .collect();
        let total: f64 = mean.iter().sum();
        if total > 0.0 {
            mean.into_iter().map(|m| m / total).collect()
        } else {
            mean
        }
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Serialize model to canonical JSON (sorted keys, no whitespace)
    pub fn to_canonical_json(&self) -> Result<String, ModelError> {
        Ok(to_canonical_json(self)?)
    }

    /// BLAKE3 of the canonical JSON, hex encoded
    pub fn hash_hex(&self) -> Result<String, ModelError> {
        Ok(hash_canonical_hex(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbdt::tree::Node;

    fn two_tree_model() -> Model {
        let t1 = Tree::new(vec![
            Node::internal(0, 0, 50.0, 1, 2, 8.0),
            Node::leaf(1, 10.0),
            Node::leaf(2, 20.0),
        ]);
        let t2 = Tree::new(vec![
            Node::internal(0, 1, 30.0, 1, 2, 2.0),
            Node::leaf(1, -5.0),
            Node::leaf(2, 5.0),
        ]);
        Model::new(vec![t1, t2], 100.0, 2)
    }

    #[test]
    fn predict_sums_trees_and_base() {
        let model = two_tree_model();
        assert_eq!(model.predict(&[30.0, 20.0]).unwrap(), 105.0);
        assert_eq!(model.predict(&[60.0, 40.0]).unwrap(), 125.0);
    }

    #[test]
    fn predict_checks_input() {
        let model = two_tree_model();
        assert!(matches!(
            model.predict(&[1.0]),
            Err(ModelError::FeatureCountMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            model.predict(&[1.0, f64::NAN]),
            Err(ModelError::NonFiniteInput { index: 1 })
        ));
    }

    #[test]
    fn importance_is_normalised() {
        let importance = two_tree_model().feature_importance();
        assert_eq!(importance.len(), 2);
        assert!((importance[0] - 0.8).abs() < 1e-12);
        assert!((importance[1] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_out_of_range_feature() {
        let mut model = two_tree_model();
        model.feature_count = 1;
        assert!(model.validate().is_err());
    }

    #[test]
    fn canonical_json_round_trip_preserves_predictions() {
        let model = two_tree_model();
        let json = model.to_canonical_json().unwrap();
        let restored: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(model, restored);
        assert_eq!(model.hash_hex().unwrap(), restored.hash_hex().unwrap());
        assert_eq!(
            model.predict(&[42.0, 7.0]).unwrap(),
            restored.predict(&[42.0, 7.0]).unwrap()
        );
    }
}
