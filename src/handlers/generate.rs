use crate::error::{ApiJson, Result};
use crate::pipeline::{self, GenerateRequest};
use crate::spec::ToolSpecification;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub tool: ToolSpecification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// POST /api/tools/generate - Run the generation pipeline.
///
/// Failures map to statuses through `AppError`: missing sample data is
/// 404, a name collision is 409, everything else a 500-class error. The
/// result is returned for review; nothing is persisted here.
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    metrics::counter!("generate_requests_total").increment(1);

    let outcome = pipeline::generate_tool_spec(
        &state.config,
        state.source.as_ref(),
        state.catalog.as_ref(),
        state.backend.as_ref(),
        &request,
    )
    .await
    .map_err(|e| {
        metrics::counter!("generate_failures_total").increment(1);
        e
    })?;

    Ok(Json(GenerateResponse {
        success: true,
        tool: outcome.tool_spec,
        explanation: outcome.explanation,
    }))
}
