//! Error types for the feature transform

use thiserror::Error;

/// Errors raised while turning raw records into engineered features.
///
/// Row numbers are 1-based data rows (the header is not counted).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    /// A required raw column is missing from the header
    #[error("schema error: required column `{column}` is missing")]
    Schema { column: String },

    /// A numeric cell, or a feature derived from it, is not a finite number
    #[error("type error: row {row}, column `{column}`: {value:?} is not a finite number")]
    Type {
        row: usize,
        column: String,
        value: String,
    },

    /// A row does not have one cell per header column
    #[error("row {row} has {actual} cells, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Transform was given an encoding state without codes for a column
    #[error("encoding state has no codes for column `{column}`")]
    MissingEncoding { column: String },

    /// A stored encoding whose codes are not a sorted, duplicate-free list
    #[error("invalid encoding state: {0}")]
    InvalidEncoding(String),
}

/// Result type for feature operations
pub type Result<T> = std::result::Result<T, FeatureError>;
