//! End-to-end classification
//!
//! Resolves the mission (caller hint, otherwise detection), records a
//! validation diagnostic, preprocesses, aligns to the mission's training
//! contract and dispatches to the registered classifier.

use crate::alignment::FeatureAligner;
use crate::detection::{DatasetTypeDetector, DetectionReport};
use crate::error::{ExoError, Result};
use crate::explanation::{ExplanationOutcome, ExplanationPayload, Explainer, FeatureValue};
use crate::inference::{FeatureImportance, InferenceEngine, PredictionResult};
use crate::mission::Mission;
use crate::model::ModelRegistry;
use crate::preprocessing::{MissionPreprocessor, PreprocessOptions, PreprocessingInfo};
use crate::utils::records_to_dataframe;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Result of classifying one table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub mission: Mission,
    /// Present when the mission was detected rather than given
    pub detection: Option<DetectionReport>,
    pub predictions: Vec<PredictionResult>,
    pub info: PreprocessingInfo,
    /// Ranked once for the whole table
    pub feature_importances: Option<Vec<FeatureImportance>>,
    pub degraded: bool,
}

/// A single classified record with its explanation attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainedPrediction {
    pub prediction: PredictionResult,
    pub payload: ExplanationPayload,
    pub explanation: Option<String>,
    pub explanation_error: Option<String>,
    pub info: PreprocessingInfo,
}

/// Detector, preprocessing options and inference engine bundled together
#[derive(Debug, Clone)]
pub struct ClassificationPipeline {
    detector: DatasetTypeDetector,
    engine: InferenceEngine,
    options: PreprocessOptions,
}

impl ClassificationPipeline {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            detector: DatasetTypeDetector::new(),
            engine: InferenceEngine::new(registry),
            options: PreprocessOptions::default(),
        }
    }

    pub fn with_detector(mut self, detector: DatasetTypeDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_options(mut self, options: PreprocessOptions) -> Self {
        self.options = options;
        self
    }

    pub fn detector(&self) -> &DatasetTypeDetector {
        &self.detector
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Mission from the hint, or from detection when no hint is given
    pub fn resolve_mission(
        &self,
        raw: &DataFrame,
        hint: Option<Mission>,
    ) -> Result<(Mission, Option<DetectionReport>)> {
        if let Some(mission) = hint {
            return Ok((mission, None));
        }

        let report = self.detector.detect_report(raw);
        match report.mission {
            Some(mission) => Ok((mission, Some(report))),
            None => {
                let best = report
                    .scores
                    .iter()
                    .map(|s| format!("{} {:.2}", s.mission, s.score))
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(ExoError::UnknownMission(format!(
                    "no signature reaches {:.2} column overlap ({})",
                    report.threshold, best
                )))
            }
        }
    }

    /// Classify every row of a raw table
    pub fn classify(&self, raw: &DataFrame, hint: Option<Mission>) -> Result<ClassificationOutcome> {
        let start = Instant::now();
        let (mission, detection) = self.resolve_mission(raw, hint)?;

        let validation = self.detector.validate(raw, mission);
        if let Some(mismatch) = validation.mismatch() {
            warn!(
                mission = %mission,
                completeness = validation.completeness,
                missing = validation.missing_columns.len(),
                "{}; missing columns will be defaulted",
                mismatch
            );
        }

        let preprocessed = MissionPreprocessor::new(mission)
            .with_options(self.options.clone())
            .preprocess(raw)?;
        let mut info = preprocessed.info;
        info.validation = Some(validation);

        let handle = self.engine.registry().get(mission)?;
        let aligner = FeatureAligner::new(handle.training_columns.clone())?;
        let (aligned, alignment) = aligner.align_with_report(&preprocessed.features, info.final_rows)?;
        info.alignment = Some(alignment);

        let predictions = self.engine.predict_batch(&aligned, mission)?;
        let feature_importances = self.engine.importances(mission)?;
        let degraded = handle.is_fallback();

        info!(
            mission = %mission,
            detected = detection.is_some(),
            rows = predictions.len(),
            degraded,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Classified table"
        );

        Ok(ClassificationOutcome {
            mission,
            detection,
            predictions,
            info,
            feature_importances,
            degraded,
        })
    }

    /// Classify one record given as a JSON object. The result carries the
    /// classifier's ranked importances.
    pub fn classify_record(
        &self,
        record: &Map<String, Value>,
        hint: Option<Mission>,
    ) -> Result<(PredictionResult, PreprocessingInfo)> {
        let raw = records_to_dataframe(std::slice::from_ref(record))?;
        let outcome = self.classify(&raw, hint)?;
        let mut prediction = outcome
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| ExoError::DataExhausted("record produced no prediction".to_string()))?;
        prediction.feature_importances = outcome.feature_importances;
        Ok((prediction, outcome.info))
    }

    /// Classify one record and ask the explainer to describe the decision.
    /// Explanation failures are reported alongside a successful prediction.
    pub async fn explain_record(
        &self,
        record: &Map<String, Value>,
        hint: Option<Mission>,
        explainer: &Explainer,
    ) -> Result<ExplainedPrediction> {
        let (prediction, info) = self.classify_record(record, hint)?;
        Ok(explain_prediction(record, prediction, info, explainer).await)
    }
}

/// Hand an already classified record to the explainer
pub async fn explain_prediction(
    record: &Map<String, Value>,
    prediction: PredictionResult,
    info: PreprocessingInfo,
    explainer: &Explainer,
) -> ExplainedPrediction {
    let features = record
        .iter()
        .map(|(name, value)| FeatureValue {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();
    let payload = explainer.payload(&prediction, features);
    let ExplanationOutcome { explanation, error } = explainer.explain(&payload).await;

    ExplainedPrediction {
        prediction,
        payload,
        explanation,
        explanation_error: error,
        info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::PredictionLabel;
    use serde_json::json;

    fn pipeline() -> ClassificationPipeline {
        ClassificationPipeline::new(Arc::new(ModelRegistry::fallback_only()))
    }

    #[test]
    fn test_unknown_table_without_hint() {
        let df = df! { "foo" => [1.0], "bar" => [2.0] }.unwrap();
        let err = pipeline().classify(&df, None).unwrap_err();
        assert!(matches!(err, ExoError::UnknownMission(_)));
    }

    #[test]
    fn test_hint_skips_detection() {
        let df = df! { "pl_rade" => [2.0, 1.1], "sy_vmag" => [11.0, 12.5] }.unwrap();
        let outcome = pipeline().classify(&df, Some(Mission::K2)).unwrap();
        assert_eq!(outcome.mission, Mission::K2);
        assert!(outcome.detection.is_none());
        assert_eq!(outcome.predictions.len(), 2);
        assert!(outcome.degraded);

        let validation = outcome.info.validation.unwrap();
        assert!(!validation.is_valid);
        let alignment = outcome.info.alignment.unwrap();
        assert!(!alignment.defaulted_columns.is_empty());
    }

    #[test]
    fn test_classify_record() {
        let record = json!({"pl_rade": 2.3, "st_rad": 0.9}).as_object().cloned().unwrap();
        let (prediction, info) = pipeline().classify_record(&record, Some(Mission::Tess)).unwrap();
        assert_eq!(prediction.mission, Mission::Tess);
        assert_eq!(prediction.label, PredictionLabel::Candidate);
        assert_eq!(info.final_rows, 1);
    }

    #[tokio::test]
    async fn test_explain_record_without_generator() {
        let record = json!({"koi_period": 9.48, "koi_prad": 2.26}).as_object().cloned().unwrap();
        let explained = pipeline()
            .explain_record(&record, Some(Mission::Kepler), &Explainer::disabled(5))
            .await
            .unwrap();
        assert!(explained.explanation.is_none());
        assert!(explained.explanation_error.is_some());
        assert_eq!(explained.payload.features.len(), 2);
        assert!(explained.prediction.degraded);
    }
}
