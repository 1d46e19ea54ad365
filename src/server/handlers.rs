//! HTTP request handlers

use std::sync::Arc;
use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::mission::Mission;
use crate::pipeline::explain_prediction;
use crate::preprocessing::PreprocessOptions;
use crate::utils::{records_to_dataframe, DataFormat, DataLoader};

use super::error::{Result, ServerError};
use super::state::AppState;

fn parse_hint(mission: Option<&str>) -> Result<Option<Mission>> {
    match mission.map(str::trim).filter(|m| !m.is_empty()) {
        Some(name) => Ok(Some(name.parse()?)),
        None => Ok(None),
    }
}

// ============================================================================
// System Handlers
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let summaries = state.registry.summaries();
    let degraded: Vec<Mission> = summaries.iter().filter(|s| s.degraded).map(|s| s.mission).collect();
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);

    Json(serde_json::json!({
        "status": if degraded.is_empty() { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "models_loaded": summaries.len() - degraded.len(),
        "degraded_missions": degraded,
        "explanations_enabled": state.explainer.is_enabled(),
        "uptime_secs": uptime.num_seconds(),
    }))
}

pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::json!({
        "success": true,
        "models": state.registry.summaries(),
    }))
}

// ============================================================================
// Detection Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    /// Column names to score
    #[serde(default)]
    pub columns: Vec<String>,
    /// Records whose keys are scored when `columns` is empty
    #[serde(default)]
    pub records: Vec<Map<String, Value>>,
}

pub async fn detect_mission(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DetectRequest>,
) -> Result<Json<Value>> {
    let mut columns = request.columns;
    if columns.is_empty() {
        for record in &request.records {
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }
    if columns.is_empty() {
        return Err(ServerError::BadRequest("Provide 'columns' or 'records' to detect".to_string()));
    }

    let detector = state.pipeline.detector();
    let report = detector.detect_columns(&columns);
    let validation = report.mission.map(|m| detector.validate_columns(&columns, m));

    Ok(Json(serde_json::json!({
        "success": true,
        "mission": report.mission,
        "detection": report,
        "validation": validation,
    })))
}

// ============================================================================
// Inference Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub mission: Option<String>,
    pub features: Map<String, Value>,
}

/// Classify a single record
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<Value>> {
    let request_id = AppState::generate_id();
    let hint = parse_hint(request.mission.as_deref())?;
    if request.features.is_empty() {
        return Err(ServerError::BadRequest("'features' must not be empty".to_string()));
    }

    let pipeline = state.pipeline.clone();
    let (prediction, info) =
        tokio::task::spawn_blocking(move || pipeline.classify_record(&request.features, hint)).await??;

    info!(request_id = %request_id, mission = %prediction.mission, label = %prediction.label, "Single prediction");

    Ok(Json(serde_json::json!({
        "success": true,
        "request_id": request_id,
        "prediction": prediction,
        "preprocessing": info,
    })))
}

#[derive(Debug, Deserialize)]
pub struct BatchPredictRequest {
    pub mission: Option<String>,
    pub records: Vec<Map<String, Value>>,
    #[serde(default)]
    pub outlier_columns: Vec<String>,
}

/// Classify many records in one classifier call
pub async fn predict_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchPredictRequest>,
) -> Result<Json<Value>> {
    let request_id = AppState::generate_id();
    let hint = parse_hint(request.mission.as_deref())?;
    if request.records.is_empty() {
        return Err(ServerError::BadRequest("'records' must not be empty".to_string()));
    }

    let pipeline = state
        .pipeline
        .clone()
        .with_options(PreprocessOptions::default().with_outlier_columns(request.outlier_columns));
    let outcome = tokio::task::spawn_blocking(move || {
        let raw = records_to_dataframe(&request.records)?;
        pipeline.classify(&raw, hint)
    })
    .await??;

    info!(
        request_id = %request_id,
        mission = %outcome.mission,
        rows = outcome.predictions.len(),
        degraded = outcome.degraded,
        "Batch prediction"
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "request_id": request_id,
        "result": outcome,
    })))
}

/// Classify an uploaded CSV, JSON or Parquet file.
///
/// Multipart fields: `file` (required), `mission` and `outlier_columns`
/// (comma-separated) are optional.
pub async fn predict_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    let request_id = AppState::generate_id();
    let mut upload = None;
    let mut mission = None;
    let mut outlier_columns = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| ServerError::BadRequest(e.to_string()))? {
        let name = field.name().unwrap_or("file").to_string();
        match name.as_str() {
            "mission" => {
                mission = Some(field.text().await.map_err(|e| ServerError::BadRequest(e.to_string()))?);
            }
            "outlier_columns" => {
                let text = field.text().await.map_err(|e| ServerError::BadRequest(e.to_string()))?;
                outlier_columns = text
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            }
            _ => {
                let file_name = field.file_name().unwrap_or("data.csv").to_string();
                let data = field.bytes().await.map_err(|e| ServerError::BadRequest(e.to_string()))?;
                info!(request_id = %request_id, file = %file_name, bytes = data.len(), "Received upload");
                upload = Some((file_name, data));
            }
        }
    }

    let (file_name, data) = upload.ok_or_else(|| ServerError::BadRequest("No file uploaded".to_string()))?;
    let format = DataFormat::from_file_name(&file_name).ok_or_else(|| {
        ServerError::BadRequest("Unsupported file format. Use CSV, JSON, or Parquet.".to_string())
    })?;
    let hint = parse_hint(mission.as_deref())?;

    let pipeline = state
        .pipeline
        .clone()
        .with_options(PreprocessOptions::default().with_outlier_columns(outlier_columns));
    let outcome = tokio::task::spawn_blocking(move || {
        let raw = DataLoader::new().load_bytes(&data, format)?;
        pipeline.classify(&raw, hint)
    })
    .await??;

    info!(
        request_id = %request_id,
        file = %file_name,
        mission = %outcome.mission,
        rows = outcome.predictions.len(),
        "Upload prediction"
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "request_id": request_id,
        "file_name": file_name,
        "result": outcome,
    })))
}

// ============================================================================
// Explanation Handlers
// ============================================================================

/// Classify a single record and attach generated text when available
pub async fn explain(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<Value>> {
    let request_id = AppState::generate_id();
    let hint = parse_hint(request.mission.as_deref())?;
    if request.features.is_empty() {
        return Err(ServerError::BadRequest("'features' must not be empty".to_string()));
    }

    let pipeline = state.pipeline.clone();
    let record = request.features;
    let (record, (prediction, info)) = tokio::task::spawn_blocking(move || {
        let classified = pipeline.classify_record(&record, hint);
        classified.map(|c| (record, c))
    })
    .await??;

    let explained = explain_prediction(&record, prediction, info, &state.explainer).await;

    info!(
        request_id = %request_id,
        mission = %explained.prediction.mission,
        explained = explained.explanation.is_some(),
        "Explained prediction"
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "request_id": request_id,
        "prediction": explained.prediction,
        "explanation": explained.explanation,
        "explanation_error": explained.explanation_error,
        "top_features": explained.payload.top_features,
        "key_features": explained.payload.key_features,
        "preprocessing": explained.info,
    })))
}
