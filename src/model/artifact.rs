//! Model artifact files
//!
//! Two on-disk formats are understood:
//! - binary: a bincode envelope with magic bytes, a format version and an
//!   FNV-1a checksum over the serialized model
//! - JSON: `{ "metadata": ..., "model": ... }`
//!
//! Loading tries the binary envelope first and falls back to JSON over the
//! same bytes.

use super::{Classifier, ClassifierModel};
use crate::error::{ExoError, Result};
use crate::mission::Mission;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// Magic bytes at the start of a binary artifact
pub const ARTIFACT_MAGIC: [u8; 4] = [b'E', b'X', b'O', b'M'];
const FORMAT_VERSION: u32 = 1;

/// Artifact file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Binary format using bincode
    #[default]
    Binary,
    /// JSON format (portable, human-readable)
    Json,
}

impl ArtifactFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactFormat::Binary => "binary",
            ArtifactFormat::Json => "json",
        }
    }
}

/// Artifact metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub name: String,
    pub mission: Mission,
    pub model_type: String,
    pub version: String,
    /// Training contract, in model input order
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl ArtifactMetadata {
    pub fn new(mission: Mission, feature_names: Vec<String>) -> Self {
        Self {
            name: format!("{}-classifier", mission),
            mission,
            model_type: "unknown".to_string(),
            version: "1.0.0".to_string(),
            feature_names,
            trained_at: None,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_trained_at(mut self, trained_at: DateTime<Utc>) -> Self {
        self.trained_at = Some(trained_at);
        self
    }

    pub fn add_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }
}

/// A classifier together with its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ArtifactMetadata,
    pub model: ClassifierModel,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactEnvelope {
    magic: [u8; 4],
    format_version: u32,
    metadata: ArtifactMetadata,
    model_data: Vec<u8>,
    checksum: u64,
}

/// FNV-1a over the serialized model bytes
fn compute_checksum(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

impl ModelArtifact {
    pub fn new(mut metadata: ArtifactMetadata, model: ClassifierModel) -> Self {
        metadata.model_type = model.model_type().to_string();
        Self { metadata, model }
    }

    /// Check that the artifact is usable for `mission`
    pub fn validate(&self, mission: Mission) -> Result<()> {
        if self.metadata.mission != mission {
            return Err(ExoError::InvalidInput(format!(
                "artifact was trained for {} but is registered for {}",
                self.metadata.mission, mission
            )));
        }

        let names = &self.metadata.feature_names;
        if names.is_empty() {
            return Err(ExoError::InvalidInput("artifact lists no feature names".to_string()));
        }
        let unique: HashSet<&String> = names.iter().collect();
        if unique.len() != names.len() {
            return Err(ExoError::InvalidInput("artifact feature names repeat".to_string()));
        }

        self.model.validate()?;
        if self.model.n_features() != names.len() {
            return Err(ExoError::ShapeError {
                expected: format!("{} features", names.len()),
                actual: format!("{} model inputs", self.model.n_features()),
            });
        }
        Ok(())
    }

    /// Serialize to bytes in the given format
    pub fn to_bytes(&self, format: ArtifactFormat) -> Result<Vec<u8>> {
        match format {
            ArtifactFormat::Binary => {
                let model_data = bincode::serialize(&self.model)?;
                let envelope = ArtifactEnvelope {
                    magic: ARTIFACT_MAGIC,
                    format_version: FORMAT_VERSION,
                    metadata: self.metadata.clone(),
                    checksum: compute_checksum(&model_data),
                    model_data,
                };
                Ok(bincode::serialize(&envelope)?)
            }
            ArtifactFormat::Json => Ok(serde_json::to_vec_pretty(self)?),
        }
    }

    /// Parse bytes, trying the binary envelope first and then JSON
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, ArtifactFormat)> {
        let binary_err = match Self::from_binary(bytes) {
            Ok(artifact) => return Ok((artifact, ArtifactFormat::Binary)),
            Err(e) => e,
        };

        match serde_json::from_slice::<ModelArtifact>(bytes) {
            Ok(artifact) => Ok((artifact, ArtifactFormat::Json)),
            Err(json_err) => Err(ExoError::SerializationError(format!(
                "not a binary artifact ({}) nor a JSON artifact ({})",
                binary_err, json_err
            ))),
        }
    }

    fn from_binary(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ARTIFACT_MAGIC.len() || bytes[..ARTIFACT_MAGIC.len()] != ARTIFACT_MAGIC {
            return Err(ExoError::SerializationError("missing magic bytes".to_string()));
        }

        let envelope: ArtifactEnvelope = bincode::deserialize(bytes)?;
        if envelope.format_version > FORMAT_VERSION {
            return Err(ExoError::SerializationError(format!(
                "unsupported format version {}",
                envelope.format_version
            )));
        }
        if compute_checksum(&envelope.model_data) != envelope.checksum {
            return Err(ExoError::SerializationError("checksum mismatch".to_string()));
        }

        let model: ClassifierModel = bincode::deserialize(&envelope.model_data)?;
        Ok(Self {
            metadata: envelope.metadata,
            model,
        })
    }

    /// Save to a file
    pub fn save(&self, path: impl AsRef<Path>, format: ArtifactFormat) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_bytes(format)?)?;
        Ok(())
    }

    /// Load from a file
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, ArtifactFormat)> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}
