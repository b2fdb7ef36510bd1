//! Crop price prediction core
//!
//! Deterministic building blocks shared by the trainer and the inference
//! service.
//!
//! Modules:
//! - `features`: Raw table schema and the feature-engineering transform
//! - `encoding`: Fitted categorical encoding (immutable value object)
//! - `analysis`: Correlation and outlier diagnostics
//! - `gbdt`: Gradient boosted regression tree model and hyperparameters
//! - `serde_canon`: Canonical JSON and BLAKE3 hashing
//! - `artifact`: Persisted model artifact with hash verification

pub mod analysis;
pub mod artifact;
pub mod encoding;
pub mod errors;
pub mod features;
pub mod gbdt;
pub mod serde_canon;

pub use analysis::{
    correlation_with_target, detect_outliers, pearson, raw_column_outliers, value_counts,
    ColumnOutliers, OutlierSummary, TargetCorrelation,
};
pub use artifact::{ArtifactError, ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use encoding::{CategoryCodes, EncodingState};
pub use errors::FeatureError;
pub use features::{
    EngineeredDataset, FeatureTransformer, FittedFeatures, RawTable, TransformReport,
};
pub use gbdt::{Hyperparameters, Model, ModelError, Node, Tree};

/// Crate version string recorded in reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
