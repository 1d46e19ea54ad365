//! Feature alignment
//!
//! Reindexes a preprocessed table to the exact, ordered column list a
//! classifier was trained on. Absent columns are injected as zeros and extra
//! columns are discarded, so the output width always equals the contract
//! length regardless of how much the input overlaps it.

use crate::error::{ExoError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// What alignment had to change to satisfy the contract
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentReport {
    /// Contract columns absent from the input, injected as zeros
    pub defaulted_columns: Vec<String>,
    /// Input columns outside the contract
    pub discarded_columns: Vec<String>,
}

/// Aligns tables to a fixed training contract
#[derive(Debug, Clone)]
pub struct FeatureAligner {
    training_columns: Vec<String>,
}

impl FeatureAligner {
    /// Create an aligner. The contract must be non-empty and free of duplicates.
    pub fn new(training_columns: Vec<String>) -> Result<Self> {
        if training_columns.is_empty() {
            return Err(ExoError::InvalidInput(
                "training contract has no feature columns".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for col in &training_columns {
            if !seen.insert(col.as_str()) {
                return Err(ExoError::InvalidInput(format!(
                    "training contract lists '{}' more than once",
                    col
                )));
            }
        }
        Ok(Self { training_columns })
    }

    pub fn training_columns(&self) -> &[String] {
        &self.training_columns
    }

    /// Align using the frame's own height
    pub fn align(&self, df: &DataFrame) -> Result<DataFrame> {
        self.align_rows(df, df.height())
    }

    /// Align to an explicit row count.
    ///
    /// The row count matters when the input has no columns left at all.
    pub fn align_rows(&self, df: &DataFrame, rows: usize) -> Result<DataFrame> {
        self.align_with_report(df, rows).map(|(aligned, _)| aligned)
    }

    /// Align and report which columns were defaulted or discarded
    pub fn align_with_report(&self, df: &DataFrame, rows: usize) -> Result<(DataFrame, AlignmentReport)> {
        if df.width() > 0 && df.height() != rows {
            return Err(ExoError::ShapeError {
                expected: format!("{} rows", rows),
                actual: format!("{} rows", df.height()),
            });
        }

        let contract: HashSet<&str> = self.training_columns.iter().map(String::as_str).collect();
        let mut report = AlignmentReport::default();

        let mut columns = Vec::with_capacity(self.training_columns.len());
        for name in &self.training_columns {
            match df.column(name) {
                Ok(col) => columns.push(col.cast(&DataType::Float64)?),
                Err(_) => {
                    report.defaulted_columns.push(name.clone());
                    columns.push(Column::new(name.as_str().into(), vec![0.0f64; rows]));
                }
            }
        }

        report.discarded_columns = df
            .get_columns()
            .iter()
            .map(|c| c.name().to_string())
            .filter(|name| !contract.contains(name.as_str()))
            .collect();

        debug!(
            width = columns.len(),
            rows,
            defaulted = report.defaulted_columns.len(),
            discarded = report.discarded_columns.len(),
            "Aligned features to training contract"
        );

        Ok((DataFrame::new(columns)?, report))
    }
}

/// Align `df` to `training_columns` in one call
pub fn align(df: &DataFrame, training_columns: &[String]) -> Result<DataFrame> {
    FeatureAligner::new(training_columns.to_vec())?.align(df)
}

/// Convert an aligned frame into a row-major classifier input.
/// Missing cells become `0.0`.
pub fn to_array2(df: &DataFrame) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = df.width();

    let col_data: Vec<Vec<f64>> = df
        .get_columns()
        .iter()
        .map(|col| {
            let casted = col.cast(&DataType::Float64)?;
            let values: Vec<f64> = casted
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()).unwrap_or(0.0))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_align_orders_and_defaults() {
        let df = df! {
            "b" => [2.0, 20.0],
            "extra" => [9.0, 9.0],
            "a" => [1.0, 10.0],
        }
        .unwrap();

        let aligner = FeatureAligner::new(contract(&["a", "b", "c"])).unwrap();
        let (out, report) = aligner.align_with_report(&df, df.height()).unwrap();

        let names: Vec<String> = out.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, contract(&["a", "b", "c"]));
        assert_eq!(out.height(), 2);
        assert_eq!(out.column("c").unwrap().f64().unwrap().get(1), Some(0.0));
        assert_eq!(report.defaulted_columns, vec!["c"]);
        assert_eq!(report.discarded_columns, vec!["extra"]);
    }

    #[test]
    fn test_align_zero_overlap() {
        let df = df! { "x" => [1.0, 2.0, 3.0] }.unwrap();
        let out = align(&df, &contract(&["p", "q"])).unwrap();
        assert_eq!(out.width(), 2);
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn test_align_zero_width_input_uses_row_count() {
        let df = DataFrame::empty();
        let aligner = FeatureAligner::new(contract(&["a"])).unwrap();
        let out = aligner.align_rows(&df, 4).unwrap();
        assert_eq!(out.shape(), (4, 1));
    }

    #[test]
    fn test_empty_contract_rejected() {
        assert!(matches!(
            FeatureAligner::new(Vec::new()),
            Err(ExoError::InvalidInput(_))
        ));
        assert!(FeatureAligner::new(contract(&["a", "a"])).is_err());
    }

    #[test]
    fn test_to_array2() {
        let df = df! {
            "a" => [Some(1.0), None],
            "b" => [Some(3.0), Some(4.0)],
        }
        .unwrap();
        let x = to_array2(&df).unwrap();
        assert_eq!(x.shape(), &[2, 2]);
        assert_eq!(x[[0, 1]], 3.0);
        assert_eq!(x[[1, 0]], 0.0);
    }
}
