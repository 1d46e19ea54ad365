//! Integration test: importance ranking and the explanation hand-off

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use exodiscovery::config::RegistryConfig;
use exodiscovery::error::{ExoError, Result};
use exodiscovery::explanation::{Explainer, ExplanationPayload, TextGenerator};
use exodiscovery::inference::{rank_importances, top_importances, PredictionLabel};
use exodiscovery::mission::Mission;
use exodiscovery::model::{
    ArtifactFormat, ArtifactMetadata, ClassifierModel, DecisionTree, ModelArtifact, ModelRegistry,
    RandomForest, TreeNode,
};
use exodiscovery::pipeline::ClassificationPipeline;
use exodiscovery::preprocessing::plan;
use serde_json::{json, Map, Value};

/// Records every prompt it is asked to complete
#[derive(Default)]
struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn generate(&self, prompt: &str, payload: &ExplanationPayload) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(format!("{} looks like a {}", payload.mission, payload.prediction))
    }
}

struct UnavailableGenerator;

#[async_trait]
impl TextGenerator for UnavailableGenerator {
    async fn generate(&self, _prompt: &str, _payload: &ExplanationPayload) -> Result<String> {
        Err(ExoError::ExplanationError("upstream returned 503".to_string()))
    }
}

fn kepler_registry(dir: &std::path::Path) -> Arc<ModelRegistry> {
    let features = plan(Mission::Kepler).default_feature_contract();
    let n = features.len();
    let period_idx = features.iter().position(|f| f == "koi_period").unwrap();
    let depth_idx = features.iter().position(|f| f == "koi_depth").unwrap();

    let tree = DecisionTree::new(
        TreeNode::split(period_idx, 10.0, TreeNode::leaf(vec![0.25, 0.75]), TreeNode::leaf(vec![0.6, 0.4])),
        vec![0.0, 1.0],
        n,
    );
    let mut importances = vec![0.0; n];
    importances[period_idx] = 0.7;
    importances[depth_idx] = 0.2;
    let forest = RandomForest::new(vec![tree], vec![0.0, 1.0], n).with_feature_importances(importances);

    let config = RegistryConfig::new(dir);
    ModelArtifact::new(ArtifactMetadata::new(Mission::Kepler, features), ClassifierModel::RandomForest(forest))
        .save(config.artifact_path(Mission::Kepler), ArtifactFormat::Binary)
        .unwrap();
    Arc::new(ModelRegistry::load(&config))
}

fn kepler_record() -> Map<String, Value> {
    json!({ "koi_period": 4.2, "koi_depth": 310.0, "koi_prad": 1.8 })
        .as_object()
        .cloned()
        .unwrap()
}

#[test]
fn test_top_importances_keep_contract_order_on_ties() {
    let names: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
    let top = top_importances(&names, &[0.5, 0.3, 0.2, 0.3], 2);
    let picked: Vec<&str> = top.iter().map(|f| f.feature.as_str()).collect();
    assert_eq!(picked, vec!["a", "b"]);

    let ranked = rank_importances(&names, &[0.5, 0.3, 0.2, 0.3]);
    let order: Vec<&str> = ranked.iter().map(|f| f.feature.as_str()).collect();
    assert_eq!(order, vec!["a", "b", "d", "c"]);
}

#[tokio::test]
async fn test_explain_record_with_generator() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ClassificationPipeline::new(kepler_registry(dir.path()));
    let generator = Arc::new(RecordingGenerator::default());
    let explainer = Explainer::new(Some(generator.clone()), 2);

    let explained = pipeline
        .explain_record(&kepler_record(), Some(Mission::Kepler), &explainer)
        .await
        .unwrap();

    assert_eq!(explained.prediction.label, PredictionLabel::Confirmed);
    assert_eq!(explained.explanation.as_deref(), Some("kepler looks like a CONFIRMED"));
    assert!(explained.explanation_error.is_none());

    let top = &explained.payload.top_features;
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].feature, "koi_period");
    assert_eq!(top[0].value, Some(json!(4.2)));
    assert_eq!(top[1].feature, "koi_depth");

    let key: Vec<&str> = explained.payload.key_features.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(key, vec!["koi_period", "koi_prad", "koi_depth"]);

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Mission: Kepler"));
    assert!(prompts[0].contains("Prediction: CONFIRMED"));
    assert!(prompts[0].contains("1. koi_period: 4.2"));
}

#[tokio::test]
async fn test_generator_failure_keeps_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ClassificationPipeline::new(kepler_registry(dir.path()));
    let explainer = Explainer::new(Some(Arc::new(UnavailableGenerator)), 3);

    let explained = pipeline
        .explain_record(&kepler_record(), Some(Mission::Kepler), &explainer)
        .await
        .unwrap();

    assert_eq!(explained.prediction.mission, Mission::Kepler);
    assert!(explained.explanation.is_none());
    assert!(explained.explanation_error.unwrap().contains("503"));
}

#[tokio::test]
async fn test_fallback_prediction_prompt_mentions_default() {
    let pipeline = ClassificationPipeline::new(Arc::new(ModelRegistry::fallback_only()));
    let generator = Arc::new(RecordingGenerator::default());
    let explainer = Explainer::new(Some(generator.clone()), 5);

    let explained = pipeline
        .explain_record(&kepler_record(), Some(Mission::Kepler), &explainer)
        .await
        .unwrap();

    assert!(explained.prediction.degraded);
    assert_eq!(explained.prediction.label, PredictionLabel::Candidate);
    assert!(explained.payload.top_features.is_empty());

    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].contains("default prediction"));
    assert!(prompts[0].contains("review before the candidate"));
}
