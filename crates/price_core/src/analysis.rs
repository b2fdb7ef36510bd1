//! Exploratory diagnostics: correlations, IQR outliers and value counts
//!
//! Nothing here alters data; results are logged and reported.

use crate::features::{EngineeredDataset, RawTable, NUMERIC_COLUMNS, PRICE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pearson correlation coefficient.
///
/// `None` when the inputs differ in length, have fewer than two points, or
/// either side is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCorrelation {
    pub feature: String,
    pub correlation: f64,
}

/// Correlation of every feature with the target, strongest positive first.
///
/// Constant features are omitted. Empty when the dataset has no target.
pub fn correlation_with_target(dataset: &EngineeredDataset) -> Vec<TargetCorrelation> {
    let Some(target) = dataset.target.as_ref() else {
        return Vec::new();
    };

    let mut out: Vec<TargetCorrelation> = dataset
        .feature_names
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            let column: Vec<f64> = dataset.rows.iter().map(|row| row[idx]).collect();
            pearson(&column, target).map(|correlation| TargetCorrelation {
                feature: name.clone(),
                correlation,
            })
        })
        .collect();

    out.sort_by(|a, b| b.correlation.total_cmp(&a.correlation));
    out
}

/// Quantile of sorted data with linear interpolation between ranks
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierSummary {
    pub count: usize,
    pub percentage: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// IQR rule: values outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]` are outliers
pub fn detect_outliers(values: &[f64]) -> Option<OutlierSummary> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25)?;
    let q3 = quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let lower_bound = q1 - 1.5 * iqr;
    let upper_bound = q3 + 1.5 * iqr;

    let count = values
        .iter()
        .filter(|&&v| v < lower_bound || v > upper_bound)
        .count();

    Some(OutlierSummary {
        count,
        percentage: count as f64 * 100.0 / values.len() as f64,
        lower_bound,
        upper_bound,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOutliers {
    pub column: String,
    pub summary: OutlierSummary,
}

/// IQR outliers for every raw numeric column present in `table`, `Price`
/// included, in schema order.
///
/// Cells that do not parse as finite numbers are skipped here; the feature
/// transform reports them.
pub fn raw_column_outliers(table: &RawTable) -> Vec<ColumnOutliers> {
    NUMERIC_COLUMNS
        .iter()
        .chain(std::iter::once(&PRICE))
        .filter_map(|&column| {
            let idx = table.column_index(column)?;
            let values: Vec<f64> = table
                .rows
                .iter()
                .filter_map(|row| row.get(idx)?.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .collect();
            detect_outliers(&values).map(|summary| ColumnOutliers {
                column: column.to_string(),
                summary,
            })
        })
        .collect()
}

/// Occurrences of each trimmed value of a categorical column
pub fn value_counts(table: &RawTable, column: &str) -> Option<BTreeMap<String, usize>> {
    let idx = table.column_index(column)?;
    let mut counts = BTreeMap::new();
    for value in table.rows.iter().filter_map(|row| row.get(idx)) {
        *counts.entry(value.trim().to_string()).or_insert(0) += 1;
    }
    Some(counts)
}
