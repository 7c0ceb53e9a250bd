//! Gradient-boosted tree model artifact
//!
//! Loads the trained ensemble exported by the offline training pipeline and
//! evaluates it on a single aligned feature row. The artifact keeps the full
//! tree structure (not an opaque compiled graph) because the explainability
//! path walks the same trees the scorer does.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Single decision node: internal nodes carry a split, leaves carry a value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub feature: usize,
    #[serde(default)]
    pub threshold: f64,
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub value: Option<f64>,
    /// Training sample count that reached this node; weights the
    /// expectation tables the explainer builds at startup
    #[serde(default = "default_cover")]
    pub cover: f64,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.value.is_some()
    }
}

fn default_cover() -> f64 {
    1.0
}

/// One boosted tree, assigned to a class group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    #[serde(default)]
    pub class_index: usize,
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    /// Walk the tree for one aligned feature row and return the leaf value
    pub fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0.0;
            };
            if let Some(value) = node.value {
                return value;
            }
            let x = features.get(node.feature).copied().unwrap_or(0.0);
            let next = if x < node.threshold { node.left } else { node.right };
            match next {
                Some(child) => idx = child,
                None => return 0.0,
            }
        }
    }
}

/// Loaded ensemble: expected feature columns, class groups, trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtModel {
    /// Expected feature columns, in exactly the order the model was trained on
    pub feature_names: Vec<String>,
    /// Number of tree groups; 1 means a sigmoid binary objective
    #[serde(default = "default_num_class")]
    pub num_class: usize,
    /// Raw-margin offset added before any tree contribution
    #[serde(default)]
    pub base_score: f64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    pub trees: Vec<Tree>,
}

fn default_num_class() -> usize {
    1
}

fn default_learning_rate() -> f64 {
    1.0
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid model artifact: {0}")]
    Invalid(String),
}

impl GbdtModel {
    /// Load and validate the model artifact from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        tracing::info!("Loading model artifact from {}", path.display());

        let raw = std::fs::read_to_string(path)?;
        let model: GbdtModel = serde_json::from_str(&raw)?;
        model.validate()?;

        tracing::info!(
            "Model loaded: {} features, {} trees, {} class group(s)",
            model.feature_names.len(),
            model.trees.len(),
            model.num_class
        );
        Ok(model)
    }

    /// Structural validation, run once at load time
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.feature_names.is_empty() {
            return Err(ModelError::Invalid("empty feature name list".into()));
        }
        if self.num_class == 0 {
            return Err(ModelError::Invalid("num_class must be at least 1".into()));
        }
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("ensemble has no trees".into()));
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.class_index >= self.num_class {
                return Err(ModelError::Invalid(format!(
                    "tree {} assigned to class {} but num_class is {}",
                    t, tree.class_index, self.num_class
                )));
            }
            if tree.nodes.is_empty() {
                return Err(ModelError::Invalid(format!("tree {} has no nodes", t)));
            }
            for (n, node) in tree.nodes.iter().enumerate() {
                if node.is_leaf() {
                    continue;
                }
                if node.feature >= self.feature_names.len() {
                    return Err(ModelError::Invalid(format!(
                        "tree {} node {} splits on feature {} but only {} features exist",
                        t, n, node.feature, self.feature_names.len()
                    )));
                }
                let (Some(left), Some(right)) = (node.left, node.right) else {
                    return Err(ModelError::Invalid(format!(
                        "tree {} node {} is neither a leaf nor a complete split",
                        t, n
                    )));
                };
                if left >= tree.nodes.len() || right >= tree.nodes.len() {
                    return Err(ModelError::Invalid(format!(
                        "tree {} node {} child index out of range",
                        t, n
                    )));
                }
                // Nodes are stored parent-before-child; this is also what
                // guarantees every tree walk terminates
                if left <= n || right <= n {
                    return Err(ModelError::Invalid(format!(
                        "tree {} node {} child index must follow its parent",
                        t, n
                    )));
                }
            }
        }
        Ok(())
    }

    /// Raw margin per class group for one aligned feature row
    pub fn predict_raw(&self, features: &[f64]) -> Vec<f64> {
        let mut margins = vec![self.base_score; self.num_class];
        for tree in &self.trees {
            margins[tree.class_index] += self.learning_rate * tree.leaf_value(features);
        }
        margins
    }

    /// Per-class probabilities for one aligned feature row.
    ///
    /// Always returns at least two entries; index 1 is the positive
    /// ("default") class.
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let margins = self.predict_raw(features);
        if margins.len() == 1 {
            let p = sigmoid(margins[0]);
            vec![1.0 - p, p]
        } else {
            softmax(&margins)
        }
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(margins: &[f64]) -> Vec<f64> {
    let max = margins.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = margins.iter().map(|m| (m - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
