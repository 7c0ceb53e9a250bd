//! New-loan request model

use serde::Deserialize;
use validator::Validate;

/// One new-loan scoring request.
///
/// `client_id` joins the request with the client's historical features;
/// the remaining fields override the matching stored columns. `days_birth`
/// and `days_employed` are conventionally non-positive (days before the
/// reference date); that convention is assumed downstream, not validated.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoanRequest {
    #[validate(range(min = 1, message = "client_id must be positive"))]
    pub client_id: i64,

    #[validate(range(min = 0.0, message = "credit_amount must be non-negative"))]
    pub credit_amount: f64,

    #[validate(range(min = 0.0, message = "income_total must be non-negative"))]
    pub income_total: f64,

    #[validate(range(min = 0.0, message = "annuity must be non-negative"))]
    pub annuity: Option<f64>,

    pub days_birth: f64,

    pub days_employed: f64,

    #[validate(range(min = 0, message = "children_count must be non-negative"))]
    pub children_count: Option<i64>,
}

impl LoanRequest {
    /// Override pairs for the assembler, (store column, value).
    ///
    /// Only fields actually present in the request appear; the assembler
    /// drops any pair whose column the store record does not carry.
    pub fn overrides(&self) -> Vec<(&'static str, f64)> {
        let mut pairs = vec![
            ("credit_amount", self.credit_amount),
            ("income_total", self.income_total),
            ("days_birth", self.days_birth),
            ("days_employed", self.days_employed),
        ];
        if let Some(annuity) = self.annuity {
            pairs.push(("annuity", annuity));
        }
        if let Some(children) = self.children_count {
            pairs.push(("children_count", children as f64));
        }
        pairs
    }
}
