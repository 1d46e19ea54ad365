//! Outlier suppression
//!
//! Values outside `[Q1 - factor*IQR, Q3 + factor*IQR]` are replaced by the
//! column median. Quantiles use linear interpolation between closest ranks.

use crate::error::{ExoError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fitted bounds for a column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub lower: f64,
    pub upper: f64,
    pub median: f64,
}

impl OutlierBounds {
    fn contains(&self, v: f64) -> bool {
        v >= self.lower && v <= self.upper
    }
}

/// IQR outlier detector that replaces outliers with the median
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierDetector {
    factor: f64,
    columns: Vec<String>,
    bounds: BTreeMap<String, OutlierBounds>,
    is_fitted: bool,
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self::iqr(1.5)
    }
}

impl OutlierDetector {
    /// Create with the IQR method
    pub fn iqr(factor: f64) -> Self {
        Self {
            factor,
            columns: Vec::new(),
            bounds: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Set the columns to process
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Compute bounds for every requested column that exists and is numeric.
    /// Missing and non-numeric columns are skipped.
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        self.bounds.clear();

        for col_name in &self.columns {
            let Ok(col) = df.column(col_name) else {
                continue;
            };
            if !is_numeric(col.dtype()) {
                continue;
            }

            let casted = col.cast(&DataType::Float64)?;
            let mut values: Vec<f64> = casted
                .f64()?
                .into_iter()
                .flatten()
                .filter(|v| !v.is_nan())
                .collect();
            if values.is_empty() {
                continue;
            }
            values.sort_by(f64::total_cmp);

            let q1 = quantile_linear(&values, 0.25);
            let q3 = quantile_linear(&values, 0.75);
            let iqr = q3 - q1;
            self.bounds.insert(
                col_name.clone(),
                OutlierBounds {
                    lower: q1 - self.factor * iqr,
                    upper: q3 + self.factor * iqr,
                    median: quantile_linear(&values, 0.5),
                },
            );
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace outliers with the median. Returns the new frame and the number
    /// of replaced cells per column.
    pub fn transform(&self, df: &DataFrame) -> Result<(DataFrame, BTreeMap<String, usize>)> {
        if !self.is_fitted {
            return Err(ExoError::InvalidInput("outlier detector is not fitted".to_string()));
        }

        let mut result = df.clone();
        let mut replaced = BTreeMap::new();

        for (col_name, bounds) in &self.bounds {
            if let Ok(col) = df.column(col_name) {
                let casted = col.cast(&DataType::Float64)?;
                let mut count = 0usize;
                let values: Vec<Option<f64>> = casted
                    .f64()?
                    .into_iter()
                    .map(|opt| {
                        opt.map(|v| {
                            if v.is_nan() || bounds.contains(v) {
                                v
                            } else {
                                count += 1;
                                bounds.median
                            }
                        })
                    })
                    .collect();
                result.with_column(Column::new(col.name().clone(), values))?;
                replaced.insert(col_name.clone(), count);
            }
        }

        Ok((result, replaced))
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<(DataFrame, BTreeMap<String, usize>)> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Get the computed bounds
    pub fn bounds(&self) -> &BTreeMap<String, OutlierBounds> {
        &self.bounds
    }
}

pub(crate) fn is_numeric(dtype: &DataType) -> bool {
    dtype.is_primitive_numeric() || matches!(dtype, DataType::Boolean)
}

/// Quantile of an ascending, non-empty slice with linear interpolation
pub(crate) fn quantile_linear(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
