//! Classifier installed when a mission's artifact cannot be loaded

use super::Classifier;
use crate::error::Result;
use ndarray::{Array1, Array2};

/// Predicts class 0 for every row of any input shape. Exposes no
/// probabilities and no importances.
#[derive(Debug, Clone)]
pub struct FallbackClassifier {
    n_features: usize,
}

impl FallbackClassifier {
    pub fn new(n_features: usize) -> Self {
        Self { n_features }
    }
}

impl Classifier for FallbackClassifier {
    fn model_type(&self) -> &'static str {
        "fallback"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(Array1::zeros(x.nrows()))
    }
}
