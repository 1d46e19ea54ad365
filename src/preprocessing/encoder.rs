//! Fill-then-one-hot encoding of a nuisance categorical column

use super::outlier::is_numeric;
use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Placeholder category when a column has no observed value at all
pub const MISSING_CATEGORY: &str = "missing";

/// How missing values of the encoded column were filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    /// Numeric column, filled with its mean and kept as-is
    MeanNumeric,
    /// Filled with the category at the rounded mean of the category codes
    MeanCodes,
    /// Filled with the most frequent category, or the `missing` placeholder
    ModeFallback,
}

/// Output of [`CategoryEncoder::encode`]
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub frame: DataFrame,
    pub method: FillMethod,
    /// One-hot columns that were created, sorted by category
    pub dummy_columns: Vec<String>,
}

/// Encoder for a single categorical column.
///
/// Text columns are filled and expanded into `<column>_<category>` indicator
/// columns (`0.0`/`1.0`), replacing the source column. Numeric columns are
/// mean-filled and left numeric.
#[derive(Debug, Clone)]
pub struct CategoryEncoder {
    column: String,
}

impl CategoryEncoder {
    pub fn new(column: impl Into<String>) -> Self {
        Self { column: column.into() }
    }

    /// Encode the column, `None` when it is absent from the frame
    pub fn encode(&self, df: &DataFrame) -> Result<Option<EncodedFrame>> {
        let Ok(col) = df.column(&self.column) else {
            return Ok(None);
        };

        if is_numeric(col.dtype()) {
            return self.encode_numeric(df, col).map(Some);
        }
        self.encode_categorical(df, col).map(Some)
    }

    fn encode_numeric(&self, df: &DataFrame, col: &Column) -> Result<EncodedFrame> {
        let casted = col.cast(&DataType::Float64)?;
        let ca = casted.f64()?;
        let observed: Vec<f64> = ca.into_iter().flatten().filter(|v| !v.is_nan()).collect();

        let mut frame = df.clone();
        if !observed.is_empty() {
            let mean = observed.iter().sum::<f64>() / observed.len() as f64;
            let filled: Vec<f64> = ca
                .into_iter()
                .map(|v| match v {
                    Some(x) if !x.is_nan() => x,
                    _ => mean,
                })
                .collect();
            frame.with_column(Column::new(col.name().clone(), filled))?;
        } else {
            frame.with_column(casted.clone())?;
        }

        Ok(EncodedFrame {
            frame,
            method: FillMethod::MeanNumeric,
            dummy_columns: Vec::new(),
        })
    }

    fn encode_categorical(&self, df: &DataFrame, col: &Column) -> Result<EncodedFrame> {
        let casted = col.cast(&DataType::String)?;
        let values: Vec<Option<String>> = casted
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect();

        let categories: Vec<&str> = values
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let (fill, method) = fill_category(&values, &categories);

        let filled: Vec<&str> = values
            .iter()
            .map(|v| v.as_deref().unwrap_or(fill.as_str()))
            .collect();

        let present: BTreeSet<&str> = filled.iter().copied().collect();
        let mut dummies = Vec::with_capacity(present.len());
        let mut dummy_columns = Vec::with_capacity(present.len());
        for category in present {
            let name = format!("{}_{}", self.column, category);
            let indicator: Vec<f64> = filled
                .iter()
                .map(|v| if *v == category { 1.0 } else { 0.0 })
                .collect();
            dummies.push(Column::new(name.as_str().into(), indicator));
            dummy_columns.push(name);
        }

        // Regenerated indicators replace any same-named columns already present
        let mut columns: Vec<Column> = df
            .get_columns()
            .iter()
            .filter(|c| {
                let name = c.name().as_str();
                name != self.column && !dummy_columns.iter().any(|d| d == name)
            })
            .cloned()
            .collect();
        columns.extend(dummies);
        let frame = DataFrame::new(columns)?;

        Ok(EncodedFrame {
            frame,
            method,
            dummy_columns,
        })
    }
}

fn fill_category(values: &[Option<String>], categories: &[&str]) -> (String, FillMethod) {
    let codes: Vec<usize> = values
        .iter()
        .flatten()
        .filter_map(|v| categories.binary_search(&v.as_str()).ok())
        .collect();

    if codes.is_empty() {
        return (MISSING_CATEGORY.to_string(), FillMethod::ModeFallback);
    }

    let mean_code = codes.iter().sum::<usize>() as f64 / codes.len() as f64;
    let fill_code = mean_code.round_ties_even();

    if fill_code >= 0.0 && (fill_code as usize) < categories.len() {
        return (categories[fill_code as usize].to_string(), FillMethod::MeanCodes);
    }

    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for code in &codes {
        *counts.entry(*code).or_insert(0) += 1;
    }
    // Ties resolve to the lowest code.
    let mut mode = 0usize;
    let mut best = 0usize;
    for (code, count) in counts {
        if count > best {
            best = count;
            mode = code;
        }
    }
    (categories[mode].to_string(), FillMethod::ModeFallback)
}
