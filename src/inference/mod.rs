//! Model dispatch and inference
//!
//! Routes an aligned feature table to the mission's classifier handle and
//! normalizes its output into [`PredictionResult`]s.

use crate::alignment::to_array2;
use crate::error::{ExoError, Result};
use crate::mission::Mission;
use crate::model::{ModelRegistry, TrainedModelHandle};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Reader-facing class label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredictionLabel {
    Confirmed,
    Candidate,
    Unrecognized,
}

impl PredictionLabel {
    /// Class 1 is confirmed and class 0 a candidate for every mission
    pub fn from_class(class: i64) -> Self {
        match class {
            1 => PredictionLabel::Confirmed,
            0 => PredictionLabel::Candidate,
            _ => PredictionLabel::Unrecognized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionLabel::Confirmed => "CONFIRMED",
            PredictionLabel::Candidate => "CANDIDATE",
            PredictionLabel::Unrecognized => "UNRECOGNIZED",
        }
    }
}

impl std::fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One feature and its importance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Normalized output for one row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub mission: Mission,
    pub raw_label: i64,
    pub label: PredictionLabel,
    pub probabilities: Option<Vec<f64>>,
    /// Maximum class probability, as a percentage
    pub confidence: Option<f64>,
    pub feature_importances: Option<Vec<FeatureImportance>>,
    /// Produced by the fallback classifier
    pub degraded: bool,
}

/// Pair feature names with importances, sorted by descending importance.
/// Equal importances keep their contract order.
pub fn rank_importances(features: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = features
        .iter()
        .zip(importances)
        .map(|(feature, importance)| FeatureImportance {
            feature: feature.clone(),
            importance: *importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

/// The first `n` entries of [`rank_importances`]
pub fn top_importances(features: &[String], importances: &[f64], n: usize) -> Vec<FeatureImportance> {
    let mut ranked = rank_importances(features, importances);
    ranked.truncate(n);
    ranked
}

/// Dispatches aligned tables to registered classifiers
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    registry: Arc<ModelRegistry>,
}

impl InferenceEngine {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Predict the first row of an aligned table, with ranked importances
    pub fn predict(&self, aligned: &DataFrame, mission: Mission) -> Result<PredictionResult> {
        let handle = self.registry.get(mission)?;
        let x = checked_input(aligned, &handle)?;
        if x.nrows() == 0 {
            return Err(ExoError::DataExhausted("no rows to predict".to_string()));
        }
        let first = x.slice(ndarray::s![0..1, ..]).to_owned();

        let mut results = run(&handle, &first)?;
        let mut result = results.remove(0);
        result.feature_importances = importances_of(&handle);
        Ok(result)
    }

    /// Predict every row with a single classifier call. Importances are not
    /// repeated per row; see [`InferenceEngine::importances`].
    pub fn predict_batch(&self, aligned: &DataFrame, mission: Mission) -> Result<Vec<PredictionResult>> {
        let handle = self.registry.get(mission)?;
        let x = checked_input(aligned, &handle)?;
        run(&handle, &x)
    }

    /// Ranked importances of a mission's classifier, if it exposes them
    pub fn importances(&self, mission: Mission) -> Result<Option<Vec<FeatureImportance>>> {
        let handle = self.registry.get(mission)?;
        Ok(importances_of(&handle))
    }
}

fn importances_of(handle: &TrainedModelHandle) -> Option<Vec<FeatureImportance>> {
    handle
        .classifier
        .feature_importances()
        .map(|imp| rank_importances(&handle.training_columns, &imp.to_vec()))
}

fn checked_input(aligned: &DataFrame, handle: &TrainedModelHandle) -> Result<Array2<f64>> {
    let names: Vec<String> = aligned.get_columns().iter().map(|c| c.name().to_string()).collect();
    if names != handle.training_columns {
        return Err(ExoError::ShapeError {
            expected: format!("{} aligned columns for {}", handle.training_columns.len(), handle.mission),
            actual: format!("{} columns", names.len()),
        });
    }
    to_array2(aligned)
}

fn run(handle: &TrainedModelHandle, x: &Array2<f64>) -> Result<Vec<PredictionResult>> {
    let start = Instant::now();
    let classes = handle.classifier.predict(x)?;
    let proba = handle.classifier.predict_proba(x)?;

    if classes.len() != x.nrows() {
        return Err(ExoError::InferenceError(format!(
            "classifier returned {} predictions for {} rows",
            classes.len(),
            x.nrows()
        )));
    }

    let results = classes
        .iter()
        .enumerate()
        .map(|(i, class)| {
            let raw_label = class.round() as i64;
            let probabilities = proba.as_ref().map(|p| p.row(i).to_vec());
            let confidence = probabilities
                .as_ref()
                .and_then(|p| p.iter().copied().reduce(f64::max))
                .map(|max| max * 100.0);
            PredictionResult {
                mission: handle.mission,
                raw_label,
                label: PredictionLabel::from_class(raw_label),
                probabilities,
                confidence,
                feature_importances: None,
                degraded: handle.is_fallback(),
            }
        })
        .collect();

    debug!(
        mission = %handle.mission,
        rows = x.nrows(),
        degraded = handle.is_fallback(),
        latency_us = start.elapsed().as_micros() as u64,
        "Inference complete"
    );

    Ok(results)
}
