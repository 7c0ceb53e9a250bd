//! Feature record - core data structure for model input
//!
//! One row of the feature store, or the assembled vector derived from it.
//! The column set belongs to the store artifact, not this binary: records
//! carry their own schema, and writes only ever overwrite existing columns.

use serde::{Deserialize, Serialize};

/// A single client's features: co-indexed column names and values.
///
/// `None` marks a missing value; the uniform fill policy is applied later,
/// at the assembler/inference boundary, never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    columns: Vec<String>,
    values: Vec<Option<f64>>,
}

impl FeatureRecord {
    /// Create from co-indexed columns and values.
    ///
    /// Truncates to the shorter of the two if they disagree; callers build
    /// both sides from the same row so this never triggers in practice.
    pub fn new(columns: Vec<String>, mut values: Vec<Option<f64>>) -> Self {
        values.truncate(columns.len());
        values.resize(columns.len(), None);
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in record order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Get a value by column name; `None` if the column is absent or missing
    pub fn get(&self, name: &str) -> Option<f64> {
        self.position(name).and_then(|i| self.values[i])
    }

    /// Overwrite an existing column's value.
    ///
    /// Returns false (and writes nothing) when the column does not exist:
    /// overlays and derived features must never widen the schema.
    pub fn set(&mut self, name: &str, value: Option<f64>) -> bool {
        match self.position(name) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }

    /// Iterate (column, value) pairs in record order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(c, v)| (c.as_str(), *v))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureRecord {
        FeatureRecord::new(
            vec!["credit_amount".into(), "income_total".into(), "annuity".into()],
            vec![Some(1000.0), Some(500.0), None],
        )
    }

    #[test]
    fn test_get_existing_and_missing() {
        let record = sample();
        assert_eq!(record.get("credit_amount"), Some(1000.0));
        assert_eq!(record.get("annuity"), None);
        assert_eq!(record.get("nonexistent"), None);
    }

    #[test]
    fn test_set_only_overwrites_existing_columns() {
        let mut record = sample();
        assert!(record.set("income_total", Some(750.0)));
        assert_eq!(record.get("income_total"), Some(750.0));

        assert!(!record.set("brand_new_column", Some(1.0)));
        assert_eq!(record.len(), 3);
        assert!(!record.has_column("brand_new_column"));
    }

    #[test]
    fn test_set_can_clear_a_value() {
        let mut record = sample();
        assert!(record.set("credit_amount", None));
        assert_eq!(record.get("credit_amount"), None);
        assert!(record.has_column("credit_amount"));
    }

    #[test]
    fn test_mismatched_lengths_are_normalized() {
        let record = FeatureRecord::new(
            vec!["a".into(), "b".into()],
            vec![Some(1.0)],
        );
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("a"), Some(1.0));
        assert_eq!(record.get("b"), None);
    }
}
