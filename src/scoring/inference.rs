//! Inference engine
//!
//! Orders the assembled vector's columns to exactly match what the model was
//! trained on, applies the uniform missing-value fill, and turns the
//! positive-class probability into a score plus a thresholded decision.
//! Column-order mismatch between serving and training is the bug class this
//! module exists to prevent.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use super::gbdt::GbdtModel;
use super::record::FeatureRecord;

/// Final scoring output for one request
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreResult {
    /// 0 = repays, 1 = defaults
    pub prediction: i32,
    /// Probability of default, in [0, 1]
    pub score: f64,
}

/// Select and reorder `vector` to exactly `expected`, filling any column the
/// vector lacks (or holds as missing) with `fill`.
///
/// Shared by the scoring and explanation paths so the explained row is
/// byte-for-byte the row the model saw.
pub fn align_features(vector: &FeatureRecord, expected: &[String], fill: f64) -> Vec<f64> {
    let by_name: HashMap<&str, Option<f64>> = vector.iter().collect();

    expected
        .iter()
        .map(|column| {
            by_name
                .get(column.as_str())
                .copied()
                .flatten()
                .unwrap_or(fill)
        })
        .collect()
}

/// Scores assembled feature vectors against the loaded ensemble.
///
/// Threshold and fill value are policy, injected from configuration.
pub struct InferenceEngine {
    model: Arc<GbdtModel>,
    decision_threshold: f64,
    fill_value: f64,
}

impl InferenceEngine {
    pub fn new(model: Arc<GbdtModel>, decision_threshold: f64, fill_value: f64) -> Self {
        Self {
            model,
            decision_threshold,
            fill_value,
        }
    }

    /// Columns the model expects, in training order
    pub fn expected_columns(&self) -> &[String] {
        &self.model.feature_names
    }

    /// Score one assembled vector
    pub fn score(&self, vector: &FeatureRecord) -> Result<ScoreResult, ScoringError> {
        let row = align_features(vector, &self.model.feature_names, self.fill_value);
        let probabilities = self.model.predict_proba(&row);

        let score = probabilities.get(1).copied().ok_or_else(|| {
            ScoringError::Internal("model produced no positive-class probability".into())
        })?;
        if !score.is_finite() {
            return Err(ScoringError::Internal(format!(
                "model produced a non-finite score: {}",
                score
            )));
        }

        let prediction = i32::from(score > self.decision_threshold);
        Ok(ScoreResult { prediction, score })
    }
}
