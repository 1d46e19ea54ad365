//! Classifiers, artifacts and the per-mission model registry

mod artifact;
mod fallback;
mod linear;
mod registry;
mod tree;

pub use artifact::{ArtifactFormat, ArtifactMetadata, ModelArtifact, ARTIFACT_MAGIC};
pub use fallback::FallbackClassifier;
pub use linear::LogisticModel;
pub use registry::{Capability, HandleSummary, ModelRegistry, TrainedModelHandle};
pub use tree::{DecisionTree, RandomForest, TreeNode};

use crate::error::{ExoError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Inference interface shared by every classifier
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Short identifier of the model family
    fn model_type(&self) -> &'static str;

    /// Number of input features expected per row
    fn n_features(&self) -> usize;

    /// Predict a class value for every row
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Class probabilities, one column per class, if the model exposes them
    fn predict_proba(&self, _x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        Ok(None)
    }

    /// Importance per input feature, if available
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}

/// Serializable classifier stored inside an artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierModel {
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    Logistic(LogisticModel),
}

impl ClassifierModel {
    fn inner(&self) -> &dyn Classifier {
        match self {
            ClassifierModel::DecisionTree(m) => m,
            ClassifierModel::RandomForest(m) => m,
            ClassifierModel::Logistic(m) => m,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ClassifierModel::DecisionTree(m) => m.validate(),
            ClassifierModel::RandomForest(m) => m.validate(),
            ClassifierModel::Logistic(m) => m.validate(),
        }
    }
}

impl Classifier for ClassifierModel {
    fn model_type(&self) -> &'static str {
        self.inner().model_type()
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        self.inner().predict_proba(x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.inner().feature_importances()
    }
}

pub(crate) fn check_width(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(ExoError::ShapeError {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

/// Class value of the most probable column per row; ties keep the first class
pub(crate) fn argmax(proba: &Array2<f64>, classes: &[f64]) -> Array1<f64> {
    proba
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0usize;
            for (j, p) in row.iter().enumerate() {
                if *p > row[best] {
                    best = j;
                }
            }
            classes.get(best).copied().unwrap_or(0.0)
        })
        .collect()
}
