//! CSV dataset loading, engineered-matrix persistence and splitting
//!
//! Raw CSVs are read as strings and handed to the feature transformer; the
//! engineered matrix is written back as a numeric CSV with the target as the
//! last column. Splits use a seeded permutation so the same seed always
//! produces the same partitions.

use cropprice_core::features::PRICE;
use cropprice_core::{EngineeredDataset, RawTable};
use std::path::Path;
use tracing::debug;

use crate::deterministic::LcgRng;
use crate::errors::{Result, TrainerError};

/// Read a raw CSV (with header) into a string table
pub fn read_raw_table<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path.as_ref())?;

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut table = RawTable::new(columns, Vec::new());
    for record in reader.records() {
        let record = record?;
        table.push_row(record.iter().map(str::to_string).collect());
    }

    debug!(path = %path.as_ref().display(), rows = table.len(), "read raw table");
    Ok(table)
}

/// Write the engineered matrix; the target, when present, is the last column
pub fn write_engineered_csv<P: AsRef<Path>>(path: P, dataset: &EngineeredDataset) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;

    let mut header = dataset.feature_names.clone();
    if dataset.target.is_some() {
        header.push(PRICE.to_string());
    }
    writer.write_record(&header)?;

    for (i, row) in dataset.rows.iter().enumerate() {
        let mut record: Vec<String> = row.iter().map(f64::to_string).collect();
        if let Some(target) = &dataset.target {
            record.push(target[i].to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|source| TrainerError::Io {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Training dataset: numeric features plus a target per row
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

/// Train/test partition produced by [`Dataset::split`]
#[derive(Clone, Debug)]
pub struct TrainTestSplit {
    pub train: Dataset,
    pub test: Dataset,
    /// Source row indices of the training partition, in partition order
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl Dataset {
    pub fn new(
        feature_names: Vec<String>,
        features: Vec<Vec<f64>>,
        targets: Vec<f64>,
    ) -> Result<Self> {
        if features.len() != targets.len() {
            return Err(TrainerError::Dataset(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }
        if let Some((i, row)) = features
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != feature_names.len())
        {
            return Err(TrainerError::Dataset(format!(
                "row {}: expected {} features, got {}",
                i + 1,
                feature_names.len(),
                row.len()
            )));
        }
        for (i, row) in features.iter().enumerate() {
            if let Some(col) = row.iter().position(|v| !v.is_finite()) {
                return Err(TrainerError::Dataset(format!(
                    "row {}: feature {} is not finite",
                    i + 1,
                    feature_names[col]
                )));
            }
        }
        if let Some(i) = targets.iter().position(|t| !t.is_finite()) {
            return Err(TrainerError::Dataset(format!("row {}: target is not finite", i + 1)));
        }
        Ok(Self {
            feature_names,
            features,
            targets,
        })
    }

    /// Take features and target from an engineered matrix
    pub fn from_engineered(dataset: EngineeredDataset) -> Result<Self> {
        let targets = dataset
            .target
            .ok_or_else(|| TrainerError::Dataset(format!("dataset has no {PRICE} column")))?;
        Self::new(dataset.feature_names, dataset.rows, targets)
    }

    /// Load an engineered CSV: header, numeric features, target last
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;

        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if header.len() < 2 {
            return Err(TrainerError::Dataset(
                "expected at least one feature column and a target column".into(),
            ));
        }
        let feature_count = header.len() - 1;

        let mut features = Vec::new();
        let mut targets = Vec::new();
        for (line_idx, record) in reader.records().enumerate() {
            let record = record?;
            let mut values = Vec::with_capacity(record.len());
            for (col, cell) in record.iter().enumerate() {
                let value = cell
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| {
                        TrainerError::Dataset(format!(
                            "line {}, column {}: {cell:?} is not a finite number",
                            line_idx + 2,
                            header[col]
                        ))
                    })?;
                values.push(value);
            }
            targets.push(values.pop().unwrap_or(f64::NAN));
            features.push(values);
        }

        if features.is_empty() {
            return Err(TrainerError::Dataset("dataset is empty".into()));
        }

        Self::new(header[..feature_count].to_vec(), features, targets)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// Rows at `indices`, in that order
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }

    /// Seeded shuffle split.
    ///
    /// The first `ceil(n * test_ratio)` rows of the permutation form the test
    /// partition; the rest, in permutation order, form the training partition.
    pub fn split(&self, seed: i64, test_ratio: f64) -> Result<TrainTestSplit> {
        if !(test_ratio > 0.0 && test_ratio < 1.0) {
            return Err(TrainerError::Dataset(format!(
                "test_ratio must be in (0, 1), got {test_ratio}"
            )));
        }

        let n = self.len();
        let order = LcgRng::new(seed).permutation(n);
        let test_len = ((n as f64) * test_ratio).ceil() as usize;
        let (test_indices, train_indices) = order.split_at(test_len.min(n));

        Ok(TrainTestSplit {
            train: self.subset(train_indices),
            test: self.subset(test_indices),
            train_indices: train_indices.to_vec(),
            test_indices: test_indices.to_vec(),
        })
    }

    /// Mean of the targets, 0 for an empty dataset
    pub fn target_mean(&self) -> f64 {
        if self.targets.is_empty() {
            0.0
        } else {
            self.targets.iter().sum::<f64>() / self.targets.len() as f64
        }
    }
}
