//! Integration test: artifact loading and the per-mission registry

use exodiscovery::config::RegistryConfig;
use exodiscovery::mission::Mission;
use exodiscovery::model::{
    ArtifactFormat, ArtifactMetadata, Capability, Classifier, ClassifierModel, DecisionTree, LogisticModel,
    ModelArtifact, ModelRegistry, RandomForest, TreeNode,
};
use exodiscovery::preprocessing::plan;
use ndarray::Array2;

fn contract(mission: Mission) -> Vec<String> {
    plan(mission).default_feature_contract()
}

fn forest_artifact(mission: Mission) -> ModelArtifact {
    let features = contract(mission);
    let n = features.len();
    let tree = DecisionTree::new(
        TreeNode::split(0, 0.5, TreeNode::leaf(vec![0.3, 0.7]), TreeNode::leaf(vec![0.9, 0.1])),
        vec![0.0, 1.0],
        n,
    );
    let mut importances = vec![0.0; n];
    importances[0] = 1.0;
    let forest = RandomForest::new(vec![tree.clone(), tree], vec![0.0, 1.0], n)
        .with_feature_importances(importances);

    ModelArtifact::new(
        ArtifactMetadata::new(mission, features).with_version("2.1.0"),
        ClassifierModel::RandomForest(forest),
    )
}

fn logistic_artifact(mission: Mission) -> ModelArtifact {
    let features = contract(mission);
    let coefficients = vec![0.1; features.len()];
    ModelArtifact::new(
        ArtifactMetadata::new(mission, features),
        ClassifierModel::Logistic(LogisticModel::new(coefficients, -0.2)),
    )
}

#[test]
fn test_missing_artifacts_fall_back_and_predict_zero() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ModelRegistry::load(&RegistryConfig::new(dir.path()));

    assert_eq!(registry.len(), 3);
    for mission in Mission::PRIORITY {
        let handle = registry.get(mission).unwrap();
        assert_eq!(handle.capability, Capability::Fallback);

        let x = Array2::from_elem((4, handle.training_columns.len()), 1.5);
        let predicted = handle.classifier.predict(&x).unwrap();
        assert!(predicted.iter().all(|v| *v == 0.0));
        assert!(handle.classifier.predict_proba(&x).unwrap().is_none());
        assert!(handle.classifier.feature_importances().is_none());
    }
}

#[test]
fn test_fallback_predicts_zero_for_any_width() {
    let registry = ModelRegistry::load(&RegistryConfig::new("/nonexistent/exodiscovery-models"));
    let handle = registry.get(Mission::Kepler).unwrap();
    assert!(handle.is_fallback());

    let x = Array2::from_elem((3, 5), 1.0);
    let predicted = handle.classifier.predict(&x).unwrap();
    assert_eq!(predicted.to_vec(), vec![0.0; 3]);
}

#[test]
fn test_fallback_contract_sizes() {
    let registry = ModelRegistry::fallback_only();
    assert_eq!(registry.get(Mission::Kepler).unwrap().training_columns.len(), 20);
    assert_eq!(registry.get(Mission::Tess).unwrap().training_columns.len(), 17);
    assert_eq!(registry.get(Mission::K2).unwrap().training_columns.len(), 13);
}

#[test]
fn test_binary_and_json_artifacts_load() {
    let dir = tempfile::tempdir().unwrap();
    let config = RegistryConfig::new(dir.path());

    forest_artifact(Mission::Kepler)
        .save(config.artifact_path(Mission::Kepler), ArtifactFormat::Binary)
        .unwrap();
    logistic_artifact(Mission::Tess)
        .save(config.artifact_path(Mission::Tess), ArtifactFormat::Json)
        .unwrap();

    let registry = ModelRegistry::load(&config);

    let kepler = registry.get(Mission::Kepler).unwrap();
    assert_eq!(kepler.capability, Capability::Fitted);
    assert_eq!(kepler.classifier.model_type(), "random_forest");
    assert_eq!(kepler.training_columns, contract(Mission::Kepler));

    let tess = registry.get(Mission::Tess).unwrap();
    assert_eq!(tess.capability, Capability::Fitted);
    assert_eq!(tess.classifier.model_type(), "logistic");

    assert!(registry.get(Mission::K2).unwrap().is_fallback());
}

#[test]
fn test_artifact_override_path() {
    let dir = tempfile::tempdir().unwrap();
    let custom = dir.path().join("nested/k2-release-7.bin");
    forest_artifact(Mission::K2).save(&custom, ArtifactFormat::Binary).unwrap();

    let config = RegistryConfig::new(dir.path().join("unused")).with_artifact(Mission::K2, &custom);
    let registry = ModelRegistry::load(&config);
    let handle = registry.get(Mission::K2).unwrap();
    assert!(!handle.is_fallback());
    assert!(handle.source.contains("k2-release-7.bin"));
}

#[test]
fn test_mission_mismatch_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let config = RegistryConfig::new(dir.path());
    forest_artifact(Mission::Tess)
        .save(config.artifact_path(Mission::K2), ArtifactFormat::Binary)
        .unwrap();

    let registry = ModelRegistry::load(&config);
    assert!(registry.get(Mission::K2).unwrap().is_fallback());
}

#[test]
fn test_corrupt_artifact_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let config = RegistryConfig::new(dir.path());
    std::fs::write(config.artifact_path(Mission::Kepler), b"EXOM not really a model").unwrap();

    let registry = ModelRegistry::load(&config);
    let handle = registry.get(Mission::Kepler).unwrap();
    assert!(handle.is_fallback());
    assert!(handle.source.starts_with("fallback"));
}

#[test]
fn test_summaries_report_degraded_missions() {
    let dir = tempfile::tempdir().unwrap();
    let config = RegistryConfig::new(dir.path());
    forest_artifact(Mission::Kepler)
        .save(config.artifact_path(Mission::Kepler), ArtifactFormat::Binary)
        .unwrap();

    let summaries = ModelRegistry::load(&config).summaries();
    let degraded: Vec<Mission> = summaries.iter().filter(|s| s.degraded).map(|s| s.mission).collect();
    assert_eq!(degraded, vec![Mission::Tess, Mission::K2]);
    assert_eq!(summaries[0].model_type, "random_forest");
}
