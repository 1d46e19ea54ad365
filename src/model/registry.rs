//! Per-mission classifier registry
//!
//! Built once at startup and shared read-only. Artifact problems never fail
//! startup: the affected mission gets a fallback handle instead.

use super::{Classifier, FallbackClassifier, ModelArtifact};
use crate::config::RegistryConfig;
use crate::error::{ExoError, Result};
use crate::mission::Mission;
use crate::preprocessing::plan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Whether a handle wraps a trained model or the zero-predicting fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Fitted,
    Fallback,
}

/// A classifier bound to a mission and its training contract
#[derive(Debug)]
pub struct TrainedModelHandle {
    pub mission: Mission,
    pub classifier: Box<dyn Classifier>,
    /// Ordered feature names the classifier expects
    pub training_columns: Vec<String>,
    pub capability: Capability,
    /// Where the classifier came from, for diagnostics
    pub source: String,
}

impl TrainedModelHandle {
    /// Wrap a validated artifact
    pub fn from_artifact(mission: Mission, artifact: ModelArtifact, source: impl Into<String>) -> Result<Self> {
        artifact.validate(mission)?;
        Ok(Self {
            mission,
            training_columns: artifact.metadata.feature_names,
            classifier: Box::new(artifact.model),
            capability: Capability::Fitted,
            source: source.into(),
        })
    }

    /// Zero-predicting handle over the mission's default feature contract
    pub fn fallback(mission: Mission, reason: impl Into<String>) -> Self {
        let training_columns = plan(mission).default_feature_contract();
        Self {
            mission,
            classifier: Box::new(FallbackClassifier::new(training_columns.len())),
            training_columns,
            capability: Capability::Fallback,
            source: reason.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.capability == Capability::Fallback
    }
}

/// Summary of a handle for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleSummary {
    pub mission: Mission,
    pub model_type: String,
    pub capability: Capability,
    pub degraded: bool,
    pub n_features: usize,
    pub training_columns: Vec<String>,
    pub source: String,
}

impl From<&TrainedModelHandle> for HandleSummary {
    fn from(handle: &TrainedModelHandle) -> Self {
        Self {
            mission: handle.mission,
            model_type: handle.classifier.model_type().to_string(),
            capability: handle.capability,
            degraded: handle.is_fallback(),
            n_features: handle.training_columns.len(),
            training_columns: handle.training_columns.clone(),
            source: handle.source.clone(),
        }
    }
}

/// Mission to classifier handle mapping
#[derive(Debug, Default)]
pub struct ModelRegistry {
    handles: BTreeMap<Mission, Arc<TrainedModelHandle>>,
}

impl ModelRegistry {
    /// Registry with no handles
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load one artifact per mission, installing a fallback on any failure
    pub fn load(config: &RegistryConfig) -> Self {
        let mut registry = Self::empty();
        for mission in Mission::PRIORITY {
            let handle = Self::load_handle(config, mission);
            registry.insert(handle);
        }
        registry
    }

    /// Every mission served by the fallback classifier
    pub fn fallback_only() -> Self {
        let mut registry = Self::empty();
        for mission in Mission::PRIORITY {
            registry.insert(TrainedModelHandle::fallback(mission, "no artifact configured"));
        }
        registry
    }

    fn load_handle(config: &RegistryConfig, mission: Mission) -> TrainedModelHandle {
        let path = config.artifact_path(mission);
        let source = path.display().to_string();

        let loaded = ModelArtifact::load(&path).and_then(|(artifact, format)| {
            TrainedModelHandle::from_artifact(mission, artifact, source.clone()).map(|h| (h, format))
        });

        match loaded {
            Ok((handle, format)) => {
                info!(
                    mission = %mission,
                    path = %source,
                    format = format.as_str(),
                    model_type = handle.classifier.model_type(),
                    n_features = handle.training_columns.len(),
                    "Loaded classifier artifact"
                );
                handle
            }
            Err(e) => {
                warn!(
                    mission = %mission,
                    path = %source,
                    error = %e,
                    "Classifier artifact unavailable, installing fallback"
                );
                TrainedModelHandle::fallback(mission, format!("fallback ({}: {})", source, e))
            }
        }
    }

    /// Register or replace the handle of its mission
    pub fn insert(&mut self, handle: TrainedModelHandle) {
        self.handles.insert(handle.mission, Arc::new(handle));
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_handle(mut self, handle: TrainedModelHandle) -> Self {
        self.insert(handle);
        self
    }

    /// Handle of a mission
    pub fn get(&self, mission: Mission) -> Result<Arc<TrainedModelHandle>> {
        self.handles
            .get(&mission)
            .cloned()
            .ok_or_else(|| ExoError::ModelUnavailable(format!("no classifier registered for {}", mission)))
    }

    /// Handle of a mission given by name
    pub fn get_by_name(&self, name: &str) -> Result<Arc<TrainedModelHandle>> {
        self.get(name.parse()?)
    }

    pub fn missions(&self) -> impl Iterator<Item = Mission> + '_ {
        self.handles.keys().copied()
    }

    /// Summaries in priority order
    pub fn summaries(&self) -> Vec<HandleSummary> {
        Mission::PRIORITY
            .iter()
            .filter_map(|m| self.handles.get(m))
            .map(|h| HandleSummary::from(h.as_ref()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
