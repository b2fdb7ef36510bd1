//! Persisted model artifact
//!
//! An artifact is written as canonical JSON next to a `.hash` file holding the
//! hex BLAKE3 digest of those exact bytes. Loading re-hashes the file and
//! rejects it on mismatch when the hash file exists.

use crate::encoding::EncodingState;
use crate::gbdt::{Hyperparameters, Model, ModelError};
use crate::serde_canon::{blake3_hex, to_canonical_json, CanonicalError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Artifact format version
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Canonical serialization error: {0}")]
    Canonical(#[from] CanonicalError),

    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("Invalid artifact: {0}")]
    Invalid(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelArtifact {
    pub format_version: u32,
    /// Feature order the model expects
    pub feature_names: Vec<String>,
    /// Name of the predicted column
    pub target: String,
    pub hyperparameters: Hyperparameters,
    pub model: Model,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<EncodingState>,
}

impl ModelArtifact {
    pub fn new(
        feature_names: Vec<String>,
        target: impl Into<String>,
        hyperparameters: Hyperparameters,
        model: Model,
    ) -> Result<Self, ArtifactError> {
        let artifact = Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            feature_names,
            target: target.into(),
            hyperparameters,
            model,
            encoding: None,
        };
        artifact.validate()?;
        Ok(artifact)
    }

    /// Attach the categorical encoding the features were produced with
    pub fn with_encoding(mut self, encoding: EncodingState) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::Invalid(format!(
                "unsupported format version {}",
                self.format_version
            )));
        }
        if self.feature_names.len() != self.model.feature_count {
            return Err(ArtifactError::Invalid(format!(
                "{} feature names for a model over {} features",
                self.feature_names.len(),
                self.model.feature_count
            )));
        }
        if let Some(encoding) = &self.encoding {
            encoding.validate().map_err(ArtifactError::Invalid)?;
        }
        self.model.validate()?;
        Ok(())
    }

    pub fn predict(&self, features: &[f64]) -> Result<f64, ArtifactError> {
        Ok(self.model.predict(features)?)
    }

    /// Hex BLAKE3 digest of the canonical JSON form
    pub fn hash_hex(&self) -> Result<String, ArtifactError> {
        Ok(blake3_hex(to_canonical_json(self)?.as_bytes()))
    }

    /// Sibling path holding the digest: `model.json` -> `model.hash`
    pub fn hash_path(path: &Path) -> PathBuf {
        path.with_extension("hash")
    }

    /// Write canonical JSON and the hash file; returns the hash.
    pub fn save(&self, path: &Path) -> Result<String, ArtifactError> {
        let json = to_canonical_json(self)?;
        let hash = blake3_hex(json.as_bytes());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ArtifactError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, &json).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let hash_path = Self::hash_path(path);
        fs::write(&hash_path, &hash).map_err(|source| ArtifactError::Io {
            path: hash_path,
            source,
        })?;

        info!(path = %path.display(), hash = %hash, "saved model artifact");
        Ok(hash)
    }

    /// Read, verify and validate an artifact.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let hash_path = Self::hash_path(path);
        if hash_path.exists() {
            let expected = fs::read_to_string(&hash_path).map_err(|source| ArtifactError::Io {
                path: hash_path.clone(),
                source,
            })?;
            let expected = expected.trim().to_string();
            let actual = blake3_hex(&bytes);
            if expected != actual {
                return Err(ArtifactError::HashMismatch { expected, actual });
            }
        } else {
            debug!(path = %hash_path.display(), "no hash file, skipping verification");
        }

        let artifact: Self = serde_json::from_slice(&bytes)?;
        artifact.validate()?;
        Ok(artifact)
    }
}
