//! Explanation hand-off
//!
//! Packages a prediction, its ranked feature importances and the raw input
//! values into an [`ExplanationPayload`], renders a prompt from it, and hands
//! both to an external [`TextGenerator`]. The generated text is returned
//! verbatim. A failing generator never fails the prediction it explains.

mod http;

pub use http::HttpTextGenerator;

use crate::error::Result;
use crate::inference::{FeatureImportance, PredictionLabel, PredictionResult};
use crate::mission::Mission;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// One raw input value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureValue {
    pub name: String,
    pub value: Value,
}

/// A ranked feature with the value it had in the explained row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopFeature {
    pub rank: usize,
    pub feature: String,
    pub importance: f64,
    pub value: Option<Value>,
}

/// Everything the text generator gets to see
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationPayload {
    pub mission: Mission,
    pub prediction: PredictionLabel,
    pub raw_label: i64,
    pub confidence: Option<f64>,
    pub probabilities: Option<Vec<f64>>,
    pub top_features: Vec<TopFeature>,
    /// Mission key features present in the input
    pub key_features: Vec<FeatureValue>,
    /// Raw input values in input order
    pub features: Vec<FeatureValue>,
    pub degraded: bool,
}

impl ExplanationPayload {
    /// Build a payload for one prediction. `importances` must already be ranked.
    pub fn new(
        result: &PredictionResult,
        features: Vec<FeatureValue>,
        importances: &[FeatureImportance],
        top_n: usize,
    ) -> Self {
        let lookup = |name: &str| features.iter().find(|f| f.name == name).map(|f| f.value.clone());

        let top_features = importances
            .iter()
            .take(top_n)
            .enumerate()
            .map(|(i, imp)| TopFeature {
                rank: i + 1,
                feature: imp.feature.clone(),
                importance: imp.importance,
                value: lookup(&imp.feature),
            })
            .collect();

        let key_features = result
            .mission
            .key_features()
            .iter()
            .filter_map(|name| {
                lookup(name).map(|value| FeatureValue {
                    name: name.to_string(),
                    value,
                })
            })
            .collect();

        Self {
            mission: result.mission,
            prediction: result.label,
            raw_label: result.raw_label,
            confidence: result.confidence,
            probabilities: result.probabilities.clone(),
            top_features,
            key_features,
            features,
            degraded: result.degraded,
        }
    }

    /// Render the generator prompt
    pub fn render_prompt(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ExplanationPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "You explain machine learning decisions for exoplanet survey missions.")?;
        writeln!(f, "Mission: {}", self.mission.display_name())?;
        writeln!(f, "Prediction: {}", self.prediction)?;
        if let Some(confidence) = self.confidence {
            writeln!(f, "Confidence: {:.1}%", confidence)?;
        }
        if self.degraded {
            writeln!(f, "Note: no trained classifier was available; this is a default prediction.")?;
        }

        writeln!(f, "\nInput data:")?;
        for feature in &self.features {
            writeln!(f, "- {}: {}", feature.name, display_value(&feature.value))?;
        }

        if !self.top_features.is_empty() {
            writeln!(f, "\nTop {} most influential features:", self.top_features.len())?;
            for top in &self.top_features {
                let value = top.value.as_ref().map(display_value).unwrap_or_else(|| "N/A".to_string());
                writeln!(f, "{}. {}: {} (importance: {:.4})", top.rank, top.feature, value, top.importance)?;
            }
        }

        writeln!(
            f,
            "\nFor each listed feature, describe how its value pushed the decision. \
             Then give the three or four main reasons for the prediction."
        )?;
        if self.prediction == PredictionLabel::Candidate {
            writeln!(
                f,
                "Finally, name the values that deserve review before the candidate could be confirmed."
            )?;
        }
        writeln!(f, "Answer in structured English with bullet points.")
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "N/A".to_string(),
        other => other.to_string(),
    }
}

/// External natural-language generator
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, payload: &ExplanationPayload) -> Result<String>;
}

/// Result of an explanation attempt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExplanationOutcome {
    pub explanation: Option<String>,
    pub error: Option<String>,
}

/// Hands payloads to an optional generator
#[derive(Clone)]
pub struct Explainer {
    generator: Option<Arc<dyn TextGenerator>>,
    top_n: usize,
}

impl std::fmt::Debug for Explainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explainer")
            .field("enabled", &self.generator.is_some())
            .field("top_n", &self.top_n)
            .finish()
    }
}

impl Explainer {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, top_n: usize) -> Self {
        Self { generator, top_n }
    }

    /// Explainer without a generator; every attempt reports that it is disabled
    pub fn disabled(top_n: usize) -> Self {
        Self::new(None, top_n)
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Build the payload for a prediction using this explainer's `top_n`
    pub fn payload(&self, result: &PredictionResult, features: Vec<FeatureValue>) -> ExplanationPayload {
        let importances = result.feature_importances.clone().unwrap_or_default();
        ExplanationPayload::new(result, features, &importances, self.top_n)
    }

    /// Ask the generator for text. Failures are reported in the outcome.
    pub async fn explain(&self, payload: &ExplanationPayload) -> ExplanationOutcome {
        let Some(generator) = &self.generator else {
            return ExplanationOutcome {
                explanation: None,
                error: Some("explanation service is not configured".to_string()),
            };
        };

        let prompt = payload.render_prompt();
        match generator.generate(&prompt, payload).await {
            Ok(text) => ExplanationOutcome {
                explanation: Some(text),
                error: None,
            },
            Err(e) => {
                warn!(mission = %payload.mission, error = %e, "Explanation generation failed");
                ExplanationOutcome {
                    explanation: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
