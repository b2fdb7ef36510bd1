//! Boosting hyperparameters

use super::model::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One point of the hyperparameter space.
///
/// `Default` is the documented baseline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Shrinkage applied to every leaf
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of rows sampled per tree, in (0, 1]
    pub subsample: f64,
    /// Fraction of features sampled per tree, in (0, 1]
    pub colsample_bytree: f64,
    /// Minimum hessian sum in each child of a split
    pub min_child_weight: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 5,
            subsample: 1.0,
            colsample_bytree: 1.0,
            min_child_weight: 1.0,
        }
    }
}

impl Hyperparameters {
    pub fn validate(&self) -> Result<(), ModelError> {
        let fraction = |name: &str, value: f64| {
            if value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(ModelError::InvalidParameters(format!("{name} must be in (0, 1], got {value}")))
            }
        };

        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParameters("n_estimators must be positive".into()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ModelError::InvalidParameters(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.max_depth == 0 {
            return Err(ModelError::InvalidParameters("max_depth must be positive".into()));
        }
        fraction("subsample", self.subsample)?;
        fraction("colsample_bytree", self.colsample_bytree)?;
        if !(self.min_child_weight >= 0.0 && self.min_child_weight.is_finite()) {
            return Err(ModelError::InvalidParameters(format!(
                "min_child_weight must be non-negative, got {}",
                self.min_child_weight
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n_estimators={} learning_rate={} max_depth={} subsample={} \
             colsample_bytree={} min_child_weight={}",
            self.n_estimators,
            self.learning_rate,
            self.max_depth,
            self.subsample,
            self.colsample_bytree,
            self.min_child_weight
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_is_valid() {
        assert!(Hyperparameters::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let base = Hyperparameters::default();
        let bad = [
            Hyperparameters { n_estimators: 0, ..base },
            Hyperparameters { learning_rate: 0.0, ..base },
            Hyperparameters { max_depth: 0, ..base },
            Hyperparameters { subsample: 1.5, ..base },
            Hyperparameters { colsample_bytree: 0.0, ..base },
            Hyperparameters { min_child_weight: -1.0, ..base },
        ];
        for params in bad {
            assert!(params.validate().is_err(), "{params} should be rejected");
        }
    }
}
