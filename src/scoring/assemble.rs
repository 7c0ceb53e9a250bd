//! Feature assembler
//!
//! Overlays request-time loan attributes onto a client's stored feature
//! record and recomputes the derived ratio columns from the post-overwrite
//! values. Pure and deterministic: same record + same overrides -> same
//! assembled vector.

use super::record::FeatureRecord;

/// Guard against zero-valued denominators in the ratio formulas
pub const EPSILON: f64 = 1e-6;

/// Sentinel in `days_employed` marking "not applicable" in the source data
pub const DAYS_EMPLOYED_SENTINEL: f64 = 365_243.0;

/// Assemble the model input vector for one request.
///
/// `overrides` are (column, value) pairs; pairs naming a column absent from
/// the record are ignored, so the assembled vector's column set is always
/// exactly the record's. Derived columns follow the same rule: a store
/// schema built without one of them simply never receives it.
pub fn assemble(record: &FeatureRecord, overrides: &[(&str, f64)]) -> FeatureRecord {
    let mut assembled = record.clone();

    for (column, value) in overrides {
        assembled.set(column, Some(*value));
    }

    recompute_derived(&mut assembled);
    assembled
}

/// Recompute the derived columns from post-overwrite values.
///
/// A derived value whose inputs are missing is itself missing, and gets the
/// uniform fill treatment at the inference boundary like any other gap.
fn recompute_derived(record: &mut FeatureRecord) {
    let days_employed = record.get("days_employed");
    let days_birth = record.get("days_birth");
    let income = record.get("income_total");
    let credit = record.get("credit_amount");
    let annuity = record.get("annuity");

    record.set(
        "days_employed_anomaly",
        days_employed.map(|d| if d == DAYS_EMPLOYED_SENTINEL { 1.0 } else { 0.0 }),
    );

    record.set(
        "days_employed_pct",
        zip(days_employed, days_birth).map(|(e, b)| e / b),
    );

    record.set(
        "income_credit_pct",
        zip(income, credit).map(|(i, c)| i / (c + EPSILON)),
    );

    // Only stores whose schema kept the family-size column carry this ratio.
    if record.has_column("family_members") {
        let family = record.get("family_members");
        record.set(
            "income_per_person",
            zip(income, family).map(|(i, f)| i / f),
        );
    }

    record.set(
        "annuity_income_pct",
        zip(annuity, income).map(|(a, i)| a / (i + EPSILON)),
    );

    record.set(
        "payment_rate",
        zip(annuity, credit).map(|(a, c)| a / (c + EPSILON)),
    );
}

fn zip(a: Option<f64>, b: Option<f64>) -> Option<(f64, f64)> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a, b)),
        _ => None,
    }
}
