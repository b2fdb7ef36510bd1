//! Regression metrics

use serde::{Deserialize, Serialize};

/// Floor applied to `|y|` in the MAPE denominator
pub const MAPE_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    /// Mean absolute percentage error, in percent
    pub mape: f64,
}

impl RegressionMetrics {
    /// Compute all metrics; both slices must have the same non-zero length
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        Self {
            rmse: mse(actual, predicted).sqrt(),
            mae: mae(actual, predicted),
            r2: r2(actual, predicted),
            mape: mape(actual, predicted),
        }
    }
}

pub fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(actual.iter().zip(predicted).map(|(y, p)| (y - p) * (y - p)), actual.len())
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mse(actual, predicted).sqrt()
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(actual.iter().zip(predicted).map(|(y, p)| (y - p).abs()), actual.len())
}

/// Coefficient of determination.
///
/// A constant target gives 1.0 for a perfect fit and 0.0 otherwise.
pub fn r2(actual: &[f64], predicted: &[f64]) -> f64 {
    let y_mean = mean(actual.iter().copied(), actual.len());
    let ss_res: f64 = actual.iter().zip(predicted).map(|(y, p)| (y - p) * (y - p)).sum();
    let ss_tot: f64 = actual.iter().map(|y| (y - y_mean) * (y - y_mean)).sum();
    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    100.0
        * mean(
            actual
                .iter()
                .zip(predicted)
                .map(|(y, p)| (y - p).abs() / y.abs().max(MAPE_EPSILON)),
            actual.len(),
        )
}

/// Mean and population standard deviation
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    let m = mean(values.iter().copied(), values.len());
    let var = mean(values.iter().map(|v| (v - m) * (v - m)), values.len());
    (m, var.sqrt())
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        values.sum::<f64>() / n as f64
    }
}
