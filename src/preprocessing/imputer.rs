//! Missing value imputation for numeric feature columns

use super::outlier::quantile_linear;
use super::plan::FillRule;
use crate::error::{ExoError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with mean
    Mean,
    /// Replace with median
    Median,
    /// Replace with a constant value
    Constant(f64),
}

impl From<FillRule> for ImputeStrategy {
    fn from(rule: FillRule) -> Self {
        match rule {
            FillRule::Mean => ImputeStrategy::Mean,
            FillRule::Median => ImputeStrategy::Median,
        }
    }
}

/// Imputer for numeric columns.
///
/// Nulls and NaNs both count as missing. A column without a single observed
/// value is filled with `0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: BTreeMap<String, f64>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Fit the imputer to the given columns
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let col = df
                .column(col_name)
                .map_err(|_| ExoError::FeatureNotFound(col_name.to_string()))?;

            let values = observed_values(col)?;
            self.fill_values
                .insert(col_name.to_string(), self.compute_fill_value(values));
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace missing values with the fitted fill values
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ExoError::InvalidInput("imputer is not fitted".to_string()));
        }

        let mut result = df.clone();

        for (col_name, fill) in &self.fill_values {
            if let Ok(col) = df.column(col_name) {
                let filled = fill_column(col, *fill)?;
                result.with_column(filled)?;
            }
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Fitted fill value of a column
    pub fn fill_value(&self, column: &str) -> Option<f64> {
        self.fill_values.get(column).copied()
    }

    fn compute_fill_value(&self, mut values: Vec<f64>) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match &self.strategy {
            ImputeStrategy::Mean => values.iter().sum::<f64>() / values.len() as f64,
            ImputeStrategy::Median => {
                values.sort_by(f64::total_cmp);
                quantile_linear(&values, 0.5)
            }
            ImputeStrategy::Constant(val) => *val,
        }
    }
}

/// Number of missing cells (null or NaN) in a numeric column
pub fn missing_count(col: &Column) -> Result<usize> {
    let casted = col.cast(&DataType::Float64)?;
    let ca = casted.f64()?;
    Ok(ca
        .into_iter()
        .filter(|v| v.map_or(true, f64::is_nan))
        .count())
}

fn observed_values(col: &Column) -> Result<Vec<f64>> {
    let casted = col.cast(&DataType::Float64)?;
    let ca = casted.f64()?;
    Ok(ca.into_iter().flatten().filter(|v| !v.is_nan()).collect())
}

fn fill_column(col: &Column, fill: f64) -> Result<Column> {
    let casted = col.cast(&DataType::Float64)?;
    let ca = casted.f64()?;

    let filled: Vec<f64> = ca
        .into_iter()
        .map(|opt| match opt {
            Some(v) if !v.is_nan() => v,
            _ => fill,
        })
        .collect();

    Ok(Column::new(col.name().clone(), filled))
}
