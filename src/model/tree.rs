//! Inference-only decision tree and random forest

use super::{argmax, check_width, Classifier};
use crate::error::{ExoError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with class probabilities
    Leaf {
        proba: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node; samples with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

impl TreeNode {
    pub fn leaf(proba: Vec<f64>) -> Self {
        TreeNode::Leaf { proba, n_samples: 0 }
    }

    pub fn split(feature_idx: usize, threshold: f64, left: TreeNode, right: TreeNode) -> Self {
        TreeNode::Split {
            feature_idx,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
            n_samples: 0,
        }
    }

    fn leaf_for(&self, row: ArrayView1<f64>) -> &[f64] {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { proba, .. } => return proba,
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if row[*feature_idx] <= *threshold { &**left } else { &**right };
                }
            }
        }
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        match self {
            TreeNode::Leaf { proba, .. } => {
                if proba.len() != n_classes {
                    return Err(ExoError::ShapeError {
                        expected: format!("{} leaf probabilities", n_classes),
                        actual: format!("{}", proba.len()),
                    });
                }
                Ok(())
            }
            TreeNode::Split { feature_idx, left, right, .. } => {
                if *feature_idx >= n_features {
                    return Err(ExoError::InvalidInput(format!(
                        "split on feature {} but the tree has {} features",
                        feature_idx, n_features
                    )));
                }
                left.validate(n_features, n_classes)?;
                right.validate(n_features, n_classes)
            }
        }
    }
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: TreeNode,
    /// Class values, in probability-column order
    classes: Vec<f64>,
    n_features: usize,
    #[serde(default)]
    feature_importances: Option<Vec<f64>>,
}

impl DecisionTree {
    pub fn new(root: TreeNode, classes: Vec<f64>, n_features: usize) -> Self {
        Self {
            root,
            classes,
            n_features,
            feature_importances: None,
        }
    }

    pub fn with_feature_importances(mut self, importances: Vec<f64>) -> Self {
        self.feature_importances = Some(importances);
        self
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Check structural consistency after deserialization
    pub fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            return Err(ExoError::InvalidInput("tree has no classes".to_string()));
        }
        if let Some(imp) = &self.feature_importances {
            if imp.len() != self.n_features {
                return Err(ExoError::ShapeError {
                    expected: format!("{} importances", self.n_features),
                    actual: format!("{}", imp.len()),
                });
            }
        }
        self.root.validate(self.n_features, self.classes.len())
    }

    fn proba_rows(&self, x: &Array2<f64>) -> Array2<f64> {
        let n_classes = self.classes.len();
        let mut proba = Array2::zeros((x.nrows(), n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            let leaf = self.root.leaf_for(row);
            for (j, p) in leaf.iter().enumerate() {
                proba[[i, j]] = *p;
            }
        }
        proba
    }
}

impl Classifier for DecisionTree {
    fn model_type(&self) -> &'static str {
        "decision_tree"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width(x, self.n_features)?;
        let proba = self.proba_rows(x);
        Ok(argmax(&proba, &self.classes))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        check_width(x, self.n_features)?;
        Ok(Some(self.proba_rows(x)))
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone().map(Array1::from_vec)
    }
}

/// Random forest classifier averaging per-tree probabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    classes: Vec<f64>,
    n_features: usize,
    #[serde(default)]
    feature_importances: Option<Vec<f64>>,
}

impl RandomForest {
    pub fn new(trees: Vec<DecisionTree>, classes: Vec<f64>, n_features: usize) -> Self {
        Self {
            trees,
            classes,
            n_features,
            feature_importances: None,
        }
    }

    pub fn with_feature_importances(mut self, importances: Vec<f64>) -> Self {
        self.feature_importances = Some(importances);
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(ExoError::InvalidInput("forest has no trees".to_string()));
        }
        for tree in &self.trees {
            tree.validate()?;
            if tree.n_features != self.n_features || tree.classes != self.classes {
                return Err(ExoError::InvalidInput(
                    "forest trees disagree on features or classes".to_string(),
                ));
            }
        }
        if let Some(imp) = &self.feature_importances {
            if imp.len() != self.n_features {
                return Err(ExoError::ShapeError {
                    expected: format!("{} importances", self.n_features),
                    actual: format!("{}", imp.len()),
                });
            }
        }
        Ok(())
    }

    fn mean_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(ExoError::InferenceError("forest has no trees".to_string()));
        }

        let sum = self
            .trees
            .par_iter()
            .map(|tree| tree.proba_rows(x))
            .reduce(
                || Array2::zeros((x.nrows(), self.classes.len())),
                |a, b| a + b,
            );

        Ok(sum / self.trees.len() as f64)
    }
}

impl Classifier for RandomForest {
    fn model_type(&self) -> &'static str {
        "random_forest"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width(x, self.n_features)?;
        let proba = self.mean_proba(x)?;
        Ok(argmax(&proba, &self.classes))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        check_width(x, self.n_features)?;
        self.mean_proba(x).map(Some)
    }

    /// Stored importances, or the mean of per-tree importances when every
    /// tree carries them
    fn feature_importances(&self) -> Option<Array1<f64>> {
        if let Some(imp) = &self.feature_importances {
            return Some(Array1::from_vec(imp.clone()));
        }

        let per_tree: Option<Vec<Array1<f64>>> =
            self.trees.iter().map(|t| t.feature_importances()).collect();
        let per_tree = per_tree.filter(|v| !v.is_empty())?;

        let mut total: Array1<f64> = Array1::zeros(self.n_features);
        for imp in &per_tree {
            total = total + imp;
        }
        Some(total / per_tree.len() as f64)
    }
}
