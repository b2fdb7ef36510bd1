//! Inference service configuration
//!
//! Defaults, then an optional TOML file, then `CROPPRICE_*` environment
//! variables (e.g. `CROPPRICE_MODEL_PATH`, `CROPPRICE_ARTIFACT_POLICY`).

use ::config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::Result;

pub const ENV_PREFIX: &str = "CROPPRICE";

/// When the artifact health check runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactPolicy {
    /// Once per process
    #[default]
    Cached,
    /// On every request, so a replaced artifact is picked up
    PerRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub model_path: PathBuf,
    pub artifact_policy: ArtifactPolicy,
    /// Bound on the model stage; 0 disables the timeout
    pub timeout_ms: u64,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/model.json"),
            artifact_policy: ArtifactPolicy::Cached,
            timeout_ms: 2_000,
            log_level: "warn".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(ConfigFile::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}
