//! Exoplanet Discovery - mission-aware exoplanet candidate classification
//!
//! Routes raw survey tables from the Kepler, K2 and TESS missions to the
//! classifier trained for that mission:
//! - the mission is detected from column-name signatures, or given as a hint
//! - a mission-specific preprocessor produces a numeric feature table
//! - the features are aligned to the classifier's training contract
//! - the mission's classifier (or a zero-predicting fallback) is invoked
//! - predictions can be handed to an external text generator for explanation
//!
//! # Modules
//!
//! ## Core
//! - [`mission`] - Missions and their raw-schema signatures
//! - [`detection`] - Dataset type detection and signature validation
//! - [`preprocessing`] - Per-mission preprocessing plans and pipeline
//! - [`alignment`] - Training-contract feature alignment
//! - [`model`] - Classifier artifacts and the per-mission registry
//! - [`inference`] - Model dispatch and prediction results
//! - [`pipeline`] - End-to-end classification
//! - [`explanation`] - Explanation payloads and text generation hand-off
//!
//! ## Services
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface
//!
//! ## Utilities
//! - [`config`] - Environment-driven configuration
//! - [`utils`] - Data loading and conversion

pub mod error;

// Core
pub mod mission;
pub mod detection;
pub mod preprocessing;
pub mod alignment;
pub mod model;
pub mod inference;
pub mod pipeline;
pub mod explanation;

// Services
pub mod server;
pub mod cli;

// Utilities
pub mod config;
pub mod utils;

pub use error::{ExoError, Result};
pub use mission::Mission;

/// Prelude for common imports
pub mod prelude {
    pub use crate::alignment::{align, FeatureAligner};
    pub use crate::config::{ExplanationConfig, RegistryConfig};
    pub use crate::detection::{DatasetTypeDetector, DetectionReport, ValidationReport};
    pub use crate::error::{ExoError, Result};
    pub use crate::explanation::{ExplanationPayload, Explainer, TextGenerator};
    pub use crate::inference::{InferenceEngine, PredictionLabel, PredictionResult};
    pub use crate::mission::Mission;
    pub use crate::model::{ModelArtifact, ModelRegistry, TrainedModelHandle};
    pub use crate::pipeline::{ClassificationOutcome, ClassificationPipeline};
    pub use crate::preprocessing::{preprocess, MissionPreprocessor, PreprocessedData, PreprocessingInfo};
}
