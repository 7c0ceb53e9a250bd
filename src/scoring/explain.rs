//! Explainability engine
//!
//! Per-feature attribution for one assembled vector, using tree-path
//! attribution over the same ensemble the scorer evaluates: every split on
//! the instance's decision path attributes the change in the subtree's
//! expected value to the split feature. Attributions and the baseline are in
//! raw-margin space and sum to the margin the model actually produced.
//!
//! The attribution computation yields one of two shapes - a per-class list
//! (one-vs-all ensembles) or a single array already specific to the positive
//! class - and both are resolved into one canonical result at the boundary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use super::gbdt::{GbdtModel, Tree};
use super::inference::align_features;
use super::record::FeatureRecord;

/// Canonical explanation for one request: four co-indexed sequences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub base_value: f64,
    pub attributions: Vec<f64>,
    pub feature_names: Vec<String>,
    pub feature_values: Vec<f64>,
}

/// Attribution for a single class: baseline plus per-feature contributions
#[derive(Debug, Clone, PartialEq)]
pub struct ClassAttribution {
    pub base_value: f64,
    pub attributions: Vec<f64>,
}

/// Raw attribution output, before normalization.
///
/// `PerClass` carries one entry per class group and the positive-class slice
/// lives at index 1; `Unified` is already specific to the positive class.
#[derive(Debug, Clone)]
pub enum AttributionOutput {
    PerClass(Vec<ClassAttribution>),
    Unified(ClassAttribution),
}

/// Resolve either attribution shape into the canonical result.
///
/// The shape check is explicit and total: an impossible shape is a
/// `ShapeMismatch`, never a silently wrong slice.
pub fn normalize_attribution(
    output: AttributionOutput,
    feature_names: Vec<String>,
    feature_values: Vec<f64>,
) -> Result<ExplanationResult, ScoringError> {
    let class = match output {
        AttributionOutput::Unified(class) => class,
        AttributionOutput::PerClass(mut classes) => {
            if classes.len() < 2 {
                return Err(ScoringError::ShapeMismatch(format!(
                    "per-class output has {} entries, no positive-class slice",
                    classes.len()
                )));
            }
            classes.swap_remove(1)
        }
    };

    if class.attributions.len() != feature_names.len() {
        return Err(ScoringError::ShapeMismatch(format!(
            "{} attributions for {} features",
            class.attributions.len(),
            feature_names.len()
        )));
    }

    Ok(ExplanationResult {
        base_value: class.base_value,
        attributions: class.attributions,
        feature_names,
        feature_values,
    })
}

/// Attribution engine, constructed once from the loaded model.
///
/// Expectation tables (cover-weighted expected value of every subtree) are
/// computed here at startup and shared read-only across requests.
pub struct Explainer {
    model: Arc<GbdtModel>,
    expectations: Vec<Vec<f64>>,
    fill_value: f64,
}

impl Explainer {
    pub fn new(model: Arc<GbdtModel>, fill_value: f64) -> Self {
        let expectations = model.trees.iter().map(tree_expectations).collect();
        Self {
            model,
            expectations,
            fill_value,
        }
    }

    /// Explain one assembled vector, reusing the scorer's column alignment
    pub fn explain(&self, vector: &FeatureRecord) -> Result<ExplanationResult, ScoringError> {
        let row = align_features(vector, &self.model.feature_names, self.fill_value);
        let output = self.attribute(&row);
        normalize_attribution(output, self.model.feature_names.clone(), row)
    }

    /// Per-feature attributions for one aligned row, in raw-margin space
    pub fn attribute(&self, row: &[f64]) -> AttributionOutput {
        let mut classes: Vec<ClassAttribution> = (0..self.model.num_class)
            .map(|class| self.attribute_class(row, class))
            .collect();

        if classes.len() == 1 {
            if let Some(class) = classes.pop() {
                return AttributionOutput::Unified(class);
            }
        }
        AttributionOutput::PerClass(classes)
    }

    fn attribute_class(&self, row: &[f64], class: usize) -> ClassAttribution {
        let lr = self.model.learning_rate;
        let mut base_value = self.model.base_score;
        let mut attributions = vec![0.0; self.model.feature_names.len()];

        for (tree, expected) in self.model.trees.iter().zip(&self.expectations) {
            if tree.class_index != class {
                continue;
            }
            base_value += lr * expected[0];

            let mut idx = 0usize;
            while let Some(node) = tree.nodes.get(idx) {
                if node.is_leaf() {
                    break;
                }
                let x = row.get(node.feature).copied().unwrap_or(0.0);
                let next = if x < node.threshold { node.left } else { node.right };
                let Some(child) = next else { break };

                attributions[node.feature] += lr * (expected[child] - expected[idx]);
                idx = child;
            }
        }

        ClassAttribution {
            base_value,
            attributions,
        }
    }
}

/// Expected value of every node's subtree, weighted by training cover.
///
/// Child indices always follow their parent (enforced at model load), so a
/// single reverse pass resolves children before parents.
fn tree_expectations(tree: &Tree) -> Vec<f64> {
    let mut expected = vec![0.0; tree.nodes.len()];
    let mut cover = vec![0.0; tree.nodes.len()];

    for (idx, node) in tree.nodes.iter().enumerate().rev() {
        if let Some(value) = node.value {
            expected[idx] = value;
            cover[idx] = node.cover;
            continue;
        }
        let (Some(left), Some(right)) = (node.left, node.right) else {
            continue;
        };
        let total = cover[left] + cover[right];
        if total > 0.0 {
            expected[idx] = (expected[left] * cover[left] + expected[right] * cover[right]) / total;
            cover[idx] = total;
        } else {
            expected[idx] = 0.5 * (expected[left] + expected[right]);
            cover[idx] = node.cover;
        }
    }

    expected
}
