//! Dataset type detection
//!
//! Scores an input table's column names against every registered mission
//! signature and picks the best match above a confidence threshold.

use crate::error::ExoError;
use crate::mission::{signature, Mission, SIGNATURES};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Minimum share of a signature that must be present for a confident match
pub const DEFAULT_DETECTION_THRESHOLD: f64 = 0.5;

/// Overlap score of one mission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionScore {
    pub mission: Mission,
    /// Signature columns present in the table
    pub matched: usize,
    /// Size of the signature
    pub required: usize,
    /// `matched / required`
    pub score: f64,
}

/// Outcome of a detection pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Best mission at or above the threshold, if any
    pub mission: Option<Mission>,
    /// Scores for every mission in priority order
    pub scores: Vec<MissionScore>,
    pub threshold: f64,
}

impl DetectionReport {
    /// Score of a specific mission
    pub fn score_for(&self, mission: Mission) -> Option<f64> {
        self.scores.iter().find(|s| s.mission == mission).map(|s| s.score)
    }
}

/// Result of validating a table against a mission signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub mission: Mission,
    pub is_valid: bool,
    pub missing_columns: Vec<String>,
    pub present_columns: Vec<String>,
    pub total_required: usize,
    pub total_present: usize,
    pub completeness: f64,
}

impl ValidationReport {
    /// Soft schema-mismatch diagnostic, present only when required columns are missing
    pub fn mismatch(&self) -> Option<ExoError> {
        if self.is_valid {
            None
        } else {
            Some(ExoError::SchemaMismatch {
                mission: self.mission.to_string(),
                missing: self.missing_columns.clone(),
            })
        }
    }
}

/// Mission detector over column names
#[derive(Debug, Clone)]
pub struct DatasetTypeDetector {
    threshold: f64,
}

impl Default for DatasetTypeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetTypeDetector {
    /// Create a detector with the default 0.5 threshold
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_DETECTION_THRESHOLD,
        }
    }

    /// Set the minimum signature coverage for a match
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score every mission against a set of column names
    pub fn scores<S: AsRef<str>>(&self, columns: &[S]) -> Vec<MissionScore> {
        let present: HashSet<&str> = columns.iter().map(|c| c.as_ref()).collect();

        SIGNATURES
            .iter()
            .map(|sig| {
                let matched = sig.columns.iter().filter(|c| present.contains(**c)).count();
                let score = if sig.is_empty() {
                    0.0
                } else {
                    matched as f64 / sig.len() as f64
                };
                MissionScore {
                    mission: sig.mission,
                    matched,
                    required: sig.len(),
                    score,
                }
            })
            .collect()
    }

    /// Detect the mission of a set of column names
    pub fn detect_columns<S: AsRef<str>>(&self, columns: &[S]) -> DetectionReport {
        let scores = self.scores(columns);

        // Strict comparison keeps the earliest mission in priority order on ties.
        let mut best: Option<&MissionScore> = None;
        for s in &scores {
            match best {
                Some(b) if s.score <= b.score => {}
                _ => best = Some(s),
            }
        }

        let mission = best
            .filter(|b| b.score >= self.threshold)
            .map(|b| b.mission);

        debug!(
            detected = ?mission,
            scores = ?scores.iter().map(|s| (s.mission.as_str(), s.score)).collect::<Vec<_>>(),
            "Dataset type detection"
        );

        DetectionReport {
            mission,
            scores,
            threshold: self.threshold,
        }
    }

    /// Detect the mission of a table, `None` meaning unknown
    pub fn detect(&self, df: &DataFrame) -> Option<Mission> {
        self.detect_report(df).mission
    }

    /// Detect the mission of a table with full scoring
    pub fn detect_report(&self, df: &DataFrame) -> DetectionReport {
        self.detect_columns(&column_names(df))
    }

    /// Validate a set of column names against a mission signature
    pub fn validate_columns<S: AsRef<str>>(&self, columns: &[S], mission: Mission) -> ValidationReport {
        let present: HashSet<&str> = columns.iter().map(|c| c.as_ref()).collect();
        let sig = signature(mission);

        let (present_columns, missing_columns): (Vec<String>, Vec<String>) = {
            let mut p = Vec::new();
            let mut m = Vec::new();
            for col in sig.columns {
                if present.contains(col) {
                    p.push(col.to_string());
                } else {
                    m.push(col.to_string());
                }
            }
            (p, m)
        };

        let total_required = sig.len();
        let total_present = present_columns.len();
        let completeness = if total_required == 0 {
            0.0
        } else {
            total_present as f64 / total_required as f64
        };

        ValidationReport {
            mission,
            is_valid: missing_columns.is_empty(),
            missing_columns,
            present_columns,
            total_required,
            total_present,
            completeness,
        }
    }

    /// Validate a table against a mission signature
    pub fn validate(&self, df: &DataFrame, mission: Mission) -> ValidationReport {
        self.validate_columns(&column_names(df), mission)
    }
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns().iter().map(|c| c.name().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(mission: Mission) -> Vec<String> {
        signature(mission).columns.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_full_signature_detected() {
        let detector = DatasetTypeDetector::new();
        for mission in Mission::PRIORITY {
            let mut columns = cols(mission);
            columns.push("some_extra_column".to_string());
            let report = detector.detect_columns(&columns);
            assert_eq!(report.mission, Some(mission));
            assert_eq!(report.score_for(mission), Some(1.0));
        }
    }

    #[test]
    fn test_low_overlap_is_unknown() {
        let detector = DatasetTypeDetector::new();
        let report = detector.detect_columns(&["ra", "dec", "foo", "bar"]);
        assert_eq!(report.mission, None);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let detector = DatasetTypeDetector::new();
        // 7 of 13 K2 columns
        let columns = ["pl_orbperlim", "pl_radelim", "pl_radj", "pl_radjlim", "ttv_flag", "sy_dist", "sy_vmag"];
        let report = detector.detect_columns(&columns);
        assert_eq!(report.mission, Some(Mission::K2));

        let strict = DatasetTypeDetector::new().with_threshold(0.6);
        assert_eq!(strict.detect_columns(&columns).mission, None);
    }

    #[test]
    fn test_tie_prefers_priority_order() {
        // A threshold of 0 with no overlap leaves every mission tied at 0.0
        let detector = DatasetTypeDetector::new().with_threshold(0.0);
        let report = detector.detect_columns(&["nothing"]);
        assert_eq!(report.mission, Some(Mission::Kepler));
    }

    #[test]
    fn test_validate_reports_missing() {
        let detector = DatasetTypeDetector::new();
        let mut columns = cols(Mission::K2);
        columns.retain(|c| c != "sy_dist");

        let report = detector.validate_columns(&columns, Mission::K2);
        assert!(!report.is_valid);
        assert_eq!(report.missing_columns, vec!["sy_dist".to_string()]);
        assert_eq!(report.total_present, 12);
        assert!((report.completeness - 12.0 / 13.0).abs() < 1e-12);
        assert!(matches!(report.mismatch(), Some(ExoError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_validate_complete() {
        let detector = DatasetTypeDetector::new();
        let report = detector.validate_columns(&cols(Mission::Tess), Mission::Tess);
        assert!(report.is_valid);
        assert_eq!(report.completeness, 1.0);
        assert!(report.mismatch().is_none());
    }
}
