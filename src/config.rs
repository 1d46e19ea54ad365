//! Environment-driven configuration for model loading and explanations

use crate::mission::Mission;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Where each mission's classifier artifact is read from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub models_dir: PathBuf,
    /// Per-mission overrides of the artifact path
    pub artifact_paths: BTreeMap<Mission, PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let mut artifact_paths = BTreeMap::new();
        for mission in Mission::PRIORITY {
            if let Ok(path) = std::env::var(mission.artifact_env_var()) {
                artifact_paths.insert(mission, PathBuf::from(path));
            }
        }

        Self {
            models_dir: std::env::var("MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./models")),
            artifact_paths,
        }
    }
}

impl RegistryConfig {
    /// Configuration rooted at `models_dir` with no overrides
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            artifact_paths: BTreeMap::new(),
        }
    }

    pub fn with_models_dir(mut self, models_dir: impl Into<PathBuf>) -> Self {
        self.models_dir = models_dir.into();
        self
    }

    pub fn with_artifact(mut self, mission: Mission, path: impl Into<PathBuf>) -> Self {
        self.artifact_paths.insert(mission, path.into());
        self
    }

    /// Artifact path of a mission: the override, or `<models_dir>/<mission>.model`
    pub fn artifact_path(&self, mission: Mission) -> PathBuf {
        self.artifact_paths
            .get(&mission)
            .cloned()
            .unwrap_or_else(|| default_artifact_path(&self.models_dir, mission))
    }
}

fn default_artifact_path(models_dir: &Path, mission: Mission) -> PathBuf {
    models_dir.join(format!("{}.model", mission))
}

/// External text generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationConfig {
    /// Generator URL; explanations are disabled when unset
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Number of ranked features quoted in the prompt
    pub top_n: usize,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("EXPLAIN_ENDPOINT").ok().filter(|s| !s.is_empty()),
            api_key: std::env::var("EXPLAIN_API_KEY").ok().filter(|s| !s.is_empty()),
            timeout_secs: std::env::var("EXPLAIN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            top_n: std::env::var("EXPLAIN_TOP_N")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        }
    }
}

impl ExplanationConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }
}
