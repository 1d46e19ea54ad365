//! Mission preprocessing
//!
//! Each mission has one static [`PreprocessingPlan`] describing:
//! - which raw columns are dropped
//! - which statistic fills missing numeric values
//! - how the target column is encoded and which rows survive it
//! - which nuisance categorical columns are filled then one-hot expanded
//!
//! [`MissionPreprocessor`] applies a plan to a raw table and returns numeric
//! features, the encoded labels when the target was present, and a
//! [`PreprocessingInfo`] diagnostic record.

mod encoder;
mod imputer;
mod labels;
mod pipeline;
pub mod outlier;
pub mod plan;

pub use encoder::{CategoryEncoder, EncodedFrame, FillMethod, MISSING_CATEGORY};
pub use imputer::{missing_count, ImputeStrategy, Imputer};
pub use labels::{encode_labels, LabelEncoding, LABEL_COLUMN};
pub use outlier::{OutlierBounds, OutlierDetector};
pub use pipeline::{MissionPreprocessor, PreprocessOptions};
pub use plan::{plan, FillRule, LabelPolicy, PreprocessingPlan, KEPLER_DELIVNAME};

use crate::alignment::AlignmentReport;
use crate::detection::ValidationReport;
use crate::error::Result;
use crate::mission::Mission;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Diagnostic record of one preprocessing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingInfo {
    pub mission: Mission,
    pub original_rows: usize,
    pub original_columns: usize,
    pub final_rows: usize,
    pub final_columns: usize,
    pub dropped_columns: Vec<String>,
    /// Rows removed by target filtering
    pub rows_removed: usize,
    /// Missing cells filled per column
    pub imputed_counts: BTreeMap<String, usize>,
    pub total_imputed: usize,
    /// Text columns parsed as numbers
    pub coerced_columns: Vec<String>,
    pub dummy_columns: Vec<String>,
    pub delivname_fill: Option<FillMethod>,
    pub outliers_replaced: BTreeMap<String, usize>,
    /// Feature columns in output order
    pub feature_columns: Vec<String>,
    pub validation: Option<ValidationReport>,
    pub alignment: Option<AlignmentReport>,
}

impl PreprocessingInfo {
    pub fn new(mission: Mission, original_rows: usize, original_columns: usize) -> Self {
        Self {
            mission,
            original_rows,
            original_columns,
            final_rows: 0,
            final_columns: 0,
            dropped_columns: Vec::new(),
            rows_removed: 0,
            imputed_counts: BTreeMap::new(),
            total_imputed: 0,
            coerced_columns: Vec::new(),
            dummy_columns: Vec::new(),
            delivname_fill: None,
            outliers_replaced: BTreeMap::new(),
            feature_columns: Vec::new(),
            validation: None,
            alignment: None,
        }
    }
}

/// Output of a mission preprocessor
#[derive(Debug, Clone)]
pub struct PreprocessedData {
    /// Numeric (Float64) feature table without missing values
    pub features: DataFrame,
    /// Encoded labels, present only when the target column was in the input
    pub labels: Option<Column>,
    pub info: PreprocessingInfo,
}

impl PreprocessedData {
    /// Number of feature rows, valid even when no feature column survived
    pub fn rows(&self) -> usize {
        self.info.final_rows
    }
}

/// Preprocess a raw table for a mission with default options
pub fn preprocess(raw: &DataFrame, mission: Mission) -> Result<PreprocessedData> {
    MissionPreprocessor::new(mission).preprocess(raw)
}
