//! Integration test: detection → preprocessing → alignment → inference

use std::sync::Arc;

use exodiscovery::alignment::FeatureAligner;
use exodiscovery::config::RegistryConfig;
use exodiscovery::error::ExoError;
use exodiscovery::inference::{InferenceEngine, PredictionLabel};
use exodiscovery::mission::{signature, Mission};
use exodiscovery::model::{
    ArtifactFormat, ArtifactMetadata, ClassifierModel, DecisionTree, ModelArtifact, ModelRegistry,
    RandomForest, TreeNode,
};
use exodiscovery::pipeline::ClassificationPipeline;
use exodiscovery::preprocessing::{plan, preprocess};
use polars::prelude::*;

/// A table carrying every signature column of `mission` (numeric values)
/// plus the given extra columns
fn survey_table(mission: Mission, rows: usize, skip: &[&str], extra: Vec<Column>) -> DataFrame {
    let mut columns: Vec<Column> = signature(mission)
        .columns
        .iter()
        .filter(|name| !skip.contains(*name))
        .enumerate()
        .map(|(j, name)| {
            let values: Vec<f64> = (0..rows).map(|i| (i * 10 + j) as f64 + 0.5).collect();
            Column::new((*name).into(), values)
        })
        .collect();
    columns.extend(extra);
    DataFrame::new(columns).unwrap()
}

/// Kepler forest splitting on `koi_period`: short periods are confirmed
fn kepler_forest_registry(dir: &std::path::Path) -> Arc<ModelRegistry> {
    let features = plan(Mission::Kepler).default_feature_contract();
    let n = features.len();
    let period_idx = features.iter().position(|f| f == "koi_period").unwrap();

    let tree = DecisionTree::new(
        TreeNode::split(period_idx, 10.0, TreeNode::leaf(vec![0.2, 0.8]), TreeNode::leaf(vec![0.9, 0.1])),
        vec![0.0, 1.0],
        n,
    );
    let mut importances = vec![0.01; n];
    importances[period_idx] = 0.6;
    let forest = RandomForest::new(vec![tree.clone(), tree.clone(), tree], vec![0.0, 1.0], n)
        .with_feature_importances(importances);

    let config = RegistryConfig::new(dir);
    ModelArtifact::new(ArtifactMetadata::new(Mission::Kepler, features), ClassifierModel::RandomForest(forest))
        .save(config.artifact_path(Mission::Kepler), ArtifactFormat::Binary)
        .unwrap();
    Arc::new(ModelRegistry::load(&config))
}

#[test]
fn test_k2_without_distance_end_to_end() {
    let disposition = Column::new("disposition".into(), ["CONFIRMED", "CANDIDATE", "REFUTED"]);
    let raw = survey_table(Mission::K2, 3, &["sy_dist"], vec![disposition]);

    let pipeline = ClassificationPipeline::new(Arc::new(ModelRegistry::fallback_only()));
    let outcome = pipeline.classify(&raw, None).unwrap();

    assert_eq!(outcome.mission, Mission::K2);
    assert!(outcome.detection.is_some());
    assert_eq!(outcome.predictions.len(), 3);
    assert!(outcome.predictions.iter().all(|p| p.mission == Mission::K2));
    assert!(outcome.degraded);

    let alignment = outcome.info.alignment.as_ref().unwrap();
    assert_eq!(alignment.defaulted_columns, vec!["sy_dist".to_string()]);
    let validation = outcome.info.validation.as_ref().unwrap();
    assert_eq!(validation.missing_columns, vec!["sy_dist".to_string()]);
}

#[test]
fn test_single_k2_record_end_to_end() {
    let raw = survey_table(Mission::K2, 1, &["sy_dist"], Vec::new());
    let registry = Arc::new(ModelRegistry::fallback_only());
    let outcome = ClassificationPipeline::new(registry).classify(&raw, None).unwrap();
    assert_eq!(outcome.predictions.len(), 1);
    assert_eq!(outcome.predictions[0].mission, Mission::K2);
    assert_eq!(outcome.predictions[0].label, PredictionLabel::Candidate);
}

#[test]
fn test_kepler_with_trained_forest() {
    let dir = tempfile::tempdir().unwrap();
    let registry = kepler_forest_registry(dir.path());

    let disposition = Column::new("koi_disposition".into(), ["CONFIRMED", "CANDIDATE", "FALSE POSITIVE"]);
    let names = Column::new("kepoi_name".into(), ["K00752.01", "K00752.02", "K00753.01"]);
    let mut raw = survey_table(Mission::Kepler, 3, &["koi_pdisposition"], vec![disposition, names]);
    // Row 0 short period, row 1 long period
    raw.with_column(Column::new("koi_period".into(), [9.48, 54.41, 19.89])).unwrap();

    let outcome = ClassificationPipeline::new(registry).classify(&raw, None).unwrap();
    assert_eq!(outcome.mission, Mission::Kepler);
    assert!(!outcome.degraded);
    assert_eq!(outcome.info.rows_removed, 1);
    assert_eq!(outcome.predictions.len(), 2);

    let first = &outcome.predictions[0];
    assert_eq!(first.label, PredictionLabel::Confirmed);
    assert!((first.confidence.unwrap() - 80.0).abs() < 1e-9);
    let second = &outcome.predictions[1];
    assert_eq!(second.label, PredictionLabel::Candidate);
    assert!((second.confidence.unwrap() - 90.0).abs() < 1e-9);

    let importances = outcome.feature_importances.unwrap();
    assert_eq!(importances[0].feature, "koi_period");
    assert!(first.feature_importances.is_none());
}

#[test]
fn test_engine_predict_single_row_carries_importances() {
    let dir = tempfile::tempdir().unwrap();
    let registry = kepler_forest_registry(dir.path());
    let engine = InferenceEngine::new(registry.clone());

    let raw = df! { "koi_period" => [4.2, 120.0], "koi_depth" => [300.0, 80.0] }.unwrap();
    let features = preprocess(&raw, Mission::Kepler).unwrap().features;
    let contract = registry.get(Mission::Kepler).unwrap().training_columns.clone();
    let aligned = FeatureAligner::new(contract).unwrap().align(&features).unwrap();

    let result = engine.predict(&aligned, Mission::Kepler).unwrap();
    assert_eq!(result.label, PredictionLabel::Confirmed);
    let proba = result.probabilities.unwrap();
    assert!((proba[0] - 0.2).abs() < 1e-9 && (proba[1] - 0.8).abs() < 1e-9);
    let top = result.feature_importances.unwrap();
    assert_eq!(top[0].feature, "koi_period");
}

#[test]
fn test_engine_importances_ranked_for_forest() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InferenceEngine::new(kepler_forest_registry(dir.path()));

    let ranked = engine.importances(Mission::Kepler).unwrap().unwrap();
    assert_eq!(ranked.len(), plan(Mission::Kepler).default_feature_contract().len());
    assert_eq!(ranked[0].feature, "koi_period");
    assert!((ranked[0].importance - 0.6).abs() < 1e-9);
}

#[test]
fn test_hint_overrides_detection() {
    let raw = survey_table(Mission::Tess, 2, &[], Vec::new());
    let pipeline = ClassificationPipeline::new(Arc::new(ModelRegistry::fallback_only()));

    let detected = pipeline.classify(&raw, None).unwrap();
    assert_eq!(detected.mission, Mission::Tess);

    let hinted = pipeline.classify(&raw, Some(Mission::K2)).unwrap();
    assert_eq!(hinted.mission, Mission::K2);
    assert!(hinted.detection.is_none());
    assert!(!hinted.info.validation.unwrap().is_valid);
}

#[test]
fn test_unknown_table_is_rejected() {
    let raw = df! { "mass" => [1.0], "radius" => [2.0] }.unwrap();
    let pipeline = ClassificationPipeline::new(Arc::new(ModelRegistry::fallback_only()));
    assert!(matches!(pipeline.classify(&raw, None), Err(ExoError::UnknownMission(_))));
}

#[test]
fn test_missing_handle_is_unavailable() {
    let raw = survey_table(Mission::Tess, 2, &[], Vec::new());
    let pipeline = ClassificationPipeline::new(Arc::new(ModelRegistry::empty()));
    assert!(matches!(pipeline.classify(&raw, None), Err(ExoError::ModelUnavailable(_))));
}
