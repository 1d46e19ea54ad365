//! Application state management

use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::explanation::{Explainer, HttpTextGenerator, TextGenerator};
use crate::model::ModelRegistry;
use crate::pipeline::ClassificationPipeline;

use super::ServerConfig;

/// Application state shared across handlers. Read-only after startup.
pub struct AppState {
    pub config: ServerConfig,
    pub registry: Arc<ModelRegistry>,
    pub pipeline: ClassificationPipeline,
    pub explainer: Explainer,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Load the registry and the configured text generator
    pub fn new(config: ServerConfig) -> Result<Self> {
        let registry = Arc::new(ModelRegistry::load(&config.registry));
        let generator = HttpTextGenerator::from_config(&config.explanation)?
            .map(|g| Arc::new(g) as Arc<dyn TextGenerator>);
        let explainer = Explainer::new(generator, config.explanation.top_n);
        Ok(Self::with_parts(config, registry, explainer))
    }

    /// Assemble state from an existing registry and explainer
    pub fn with_parts(config: ServerConfig, registry: Arc<ModelRegistry>, explainer: Explainer) -> Self {
        Self {
            pipeline: ClassificationPipeline::new(Arc::clone(&registry)),
            config,
            registry,
            explainer,
            started_at: chrono::Utc::now(),
        }
    }

    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }
}
