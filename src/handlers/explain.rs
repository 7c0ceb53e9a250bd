//! Explanation handler

use axum::{
    extract::{Path, State},
    Json,
};

use crate::scoring::assemble::assemble;
use crate::scoring::explain::ExplanationResult;
use crate::{AppState, ApiResult};

/// Per-feature attribution breakdown for one client.
///
/// Assembles the same vector the scorer would see (no request-time
/// overrides), so the explanation matches what the model actually scores.
pub async fn explain(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
) -> ApiResult<Json<ExplanationResult>> {
    let store = state.store()?;
    let explainer = state.explainer()?;

    let record = store.lookup(client_id).await?;
    let vector = assemble(&record, &[]);
    let result = explainer.explain(&vector)?;

    tracing::debug!(client_id, base_value = result.base_value, "explained request");

    Ok(Json(result))
}
