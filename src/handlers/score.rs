//! Scoring handler

use axum::{extract::State, Json};
use validator::Validate;

use crate::models::LoanRequest;
use crate::scoring::assemble::assemble;
use crate::scoring::inference::ScoreResult;
use crate::{AppState, ApiResult, ScoringError};

/// Score one new-loan request: lookup, assemble, infer.
///
/// Failures propagate unchanged; a failed lookup or inference never turns
/// into a fabricated score.
pub async fn score(
    State(state): State<AppState>,
    Json(request): Json<LoanRequest>,
) -> ApiResult<Json<ScoreResult>> {
    request
        .validate()
        .map_err(|e| ScoringError::InvalidOverride(e.to_string()))?;

    let store = state.store()?;
    let engine = state.engine()?;

    let record = store.lookup(request.client_id).await?;
    let vector = assemble(&record, &request.overrides());
    let result = engine.score(&vector)?;

    tracing::debug!(
        client_id = request.client_id,
        score = result.score,
        prediction = result.prediction,
        "scored request"
    );

    // Best-effort: an audit failure must never fail the response
    if let Some(audit) = &state.audit {
        if let Err(e) = audit.append(request.client_id, &vector, &result) {
            tracing::warn!("Audit log append failed: {}", e);
        }
    }

    Ok(Json(result))
}
