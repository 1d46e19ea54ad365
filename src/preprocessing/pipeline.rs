//! Mission preprocessing pipeline

use super::{
    encoder::CategoryEncoder,
    imputer::{missing_count, Imputer},
    labels::encode_labels,
    outlier::{is_numeric, OutlierDetector},
    plan::{plan, PreprocessingPlan},
    PreprocessedData, PreprocessingInfo,
};
use crate::error::{ExoError, Result};
use crate::mission::Mission;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Caller-supplied preprocessing options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessOptions {
    /// Numeric columns to run IQR outlier suppression on (Kepler only)
    #[serde(default)]
    pub outlier_columns: Vec<String>,
}

impl PreprocessOptions {
    pub fn with_outlier_columns(mut self, columns: Vec<String>) -> Self {
        self.outlier_columns = columns;
        self
    }
}

/// Turns a raw mission table into a numeric feature table
#[derive(Debug, Clone)]
pub struct MissionPreprocessor {
    plan: &'static PreprocessingPlan,
    options: PreprocessOptions,
}

impl MissionPreprocessor {
    /// Create a preprocessor for a mission with default options
    pub fn new(mission: Mission) -> Self {
        Self {
            plan: plan(mission),
            options: PreprocessOptions::default(),
        }
    }

    pub fn kepler() -> Self {
        Self::new(Mission::Kepler)
    }

    pub fn k2() -> Self {
        Self::new(Mission::K2)
    }

    pub fn tess() -> Self {
        Self::new(Mission::Tess)
    }

    pub fn with_options(mut self, options: PreprocessOptions) -> Self {
        self.options = options;
        self
    }

    pub fn mission(&self) -> Mission {
        self.plan.mission
    }

    pub fn plan(&self) -> &'static PreprocessingPlan {
        self.plan
    }

    /// Run the full pipeline: drop, labels, categorical encoding, optional
    /// outlier suppression, numeric coercion, fill.
    ///
    /// The input is never modified. With default options, running the
    /// pipeline on its own output yields the same features. Outlier bounds
    /// are refitted on every run, so a second suppression pass only leaves
    /// the data unchanged when no value falls outside the refitted bounds.
    pub fn preprocess(&self, raw: &DataFrame) -> Result<PreprocessedData> {
        let start = Instant::now();
        let plan = self.plan;
        let mut info = PreprocessingInfo::new(plan.mission, raw.height(), raw.width());

        if raw.height() == 0 {
            return Err(ExoError::DataExhausted(format!(
                "{} table has no rows",
                plan.mission.display_name()
            )));
        }

        // 1) Drop list, tolerant of absent columns
        let mut kept = Vec::with_capacity(raw.width());
        for col in raw.get_columns() {
            if plan.drops(col.name().as_str()) {
                info.dropped_columns.push(col.name().to_string());
            } else {
                kept.push(col.clone());
            }
        }
        let mut data = DataFrame::new(kept)?;
        let mut rows = raw.height();

        // 2) Target column
        let mut labels = None;
        let encoding = match data.column(plan.target) {
            Ok(target) => Some(encode_labels(target, plan)?),
            Err(_) => None,
        };
        if let Some(encoding) = encoding {
            info.rows_removed = encoding.rows_removed();
            if info.rows_removed > 0 {
                let mask = BooleanChunked::from_slice("keep".into(), &encoding.keep);
                data = data.filter(&mask)?;
                rows -= info.rows_removed;
            }
            if rows == 0 {
                return Err(ExoError::DataExhausted(format!(
                    "no rows remain after filtering '{}' to known dispositions",
                    plan.target
                )));
            }
            labels = Some(encoding.to_column());
            data = data.drop(plan.target)?;
        }

        // 3) Fill-then-one-hot columns
        for column in plan.dummy_columns {
            if let Some(encoded) = CategoryEncoder::new(*column).encode(&data)? {
                data = encoded.frame;
                info.delivname_fill = Some(encoded.method);
                info.dummy_columns.extend(encoded.dummy_columns);
            }
        }

        // 4) Optional outlier suppression
        if !self.options.outlier_columns.is_empty() {
            if plan.supports_outliers {
                let mut detector =
                    OutlierDetector::iqr(1.5).with_columns(self.options.outlier_columns.clone());
                let (suppressed, replaced) = detector.fit_transform(&data)?;
                data = suppressed;
                info.outliers_replaced = replaced;
            } else {
                warn!(
                    mission = %plan.mission,
                    columns = ?self.options.outlier_columns,
                    "Outlier suppression is not applied to this mission"
                );
            }
        }

        // 5) Everything left becomes Float64
        let (coerced, coerced_columns) = coerce_numeric(&data)?;
        data = coerced;
        info.coerced_columns = coerced_columns;

        // 6) Mission fill statistic
        let names: Vec<String> = data.get_columns().iter().map(|c| c.name().to_string()).collect();
        for name in &names {
            let missing = missing_count(data.column(name)?)?;
            if missing > 0 {
                info.imputed_counts.insert(name.clone(), missing);
                info.total_imputed += missing;
            }
        }
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut imputer = Imputer::new(plan.fill.into());
        data = imputer.fit_transform(&data, &name_refs)?;

        info.final_rows = rows;
        info.final_columns = data.width();
        info.feature_columns = names;

        info!(
            mission = %plan.mission,
            rows_in = info.original_rows,
            rows_out = info.final_rows,
            columns_out = info.final_columns,
            dropped = info.dropped_columns.len(),
            imputed = info.total_imputed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Preprocessed table"
        );

        Ok(PreprocessedData {
            features: data,
            labels,
            info,
        })
    }
}

/// Cast numeric columns to Float64 and parse text columns as trimmed numbers.
/// Unparseable cells become null. Returns the names of parsed text columns.
fn coerce_numeric(df: &DataFrame) -> Result<(DataFrame, Vec<String>)> {
    let mut coerced = Vec::new();
    let mut columns = Vec::with_capacity(df.width());

    for col in df.get_columns() {
        if is_numeric(col.dtype()) {
            columns.push(col.cast(&DataType::Float64)?);
            continue;
        }

        let text = col.cast(&DataType::String)?;
        let parsed: Vec<Option<f64>> = text
            .str()?
            .into_iter()
            .map(|v| {
                v.and_then(|s| s.trim().parse::<f64>().ok())
                    .filter(|x| !x.is_nan())
            })
            .collect();
        columns.push(Column::new(col.name().clone(), parsed));
        coerced.push(col.name().to_string());
    }

    Ok((DataFrame::new(columns)?, coerced))
}
