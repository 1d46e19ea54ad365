//! Binary logistic regression (inference only)

use super::{check_width, Classifier};
use crate::error::{ExoError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    coefficients: Vec<f64>,
    intercept: f64,
    #[serde(default = "default_threshold")]
    threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

impl LogisticModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
            threshold: default_threshold(),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.coefficients.is_empty() {
            return Err(ExoError::InvalidInput("logistic model has no coefficients".to_string()));
        }
        Ok(())
    }

    fn positive_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        let w = Array1::from_vec(self.coefficients.clone());
        (x.dot(&w) + self.intercept).mapv(|z| 1.0 / (1.0 + (-z).exp()))
    }
}

impl Classifier for LogisticModel {
    fn model_type(&self) -> &'static str {
        "logistic"
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width(x, self.coefficients.len())?;
        Ok(self
            .positive_proba(x)
            .mapv(|p| if p >= self.threshold { 1.0 } else { 0.0 }))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        check_width(x, self.coefficients.len())?;
        let p1 = self.positive_proba(x);
        let mut proba = Array2::zeros((x.nrows(), 2));
        for (i, p) in p1.iter().enumerate() {
            proba[[i, 0]] = 1.0 - p;
            proba[[i, 1]] = *p;
        }
        Ok(Some(proba))
    }
}
