use crate::error::{ApiJson, AppError, Result};
use crate::slug::{is_valid_slug, to_slug};
use crate::spec::ToolSpecification;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /api/tools - List all saved tool specifications.
pub async fn list_tools_handler(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let tools = state.catalog.list_tools().await?;
    Ok(Json(json!({ "success": true, "tools": tools })))
}

/// POST /api/tools - Save (upsert) a tool specification.
///
/// The name is slugified before the uniqueness check; a conflict is any
/// stored tool owning the slug with a different identity. The check and
/// the write are two separate calls with no atomicity between them.
pub async fn save_tool_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(mut tool): ApiJson<ToolSpecification>,
) -> Result<Json<Value>> {
    if tool.name.trim().is_empty() {
        return Err(AppError::Validation("Tool name is required".to_string()));
    }

    let slug = to_slug(&tool.name);
    if !is_valid_slug(&slug) {
        return Err(AppError::Validation(
            "Tool name must be a valid slug (lowercase letters, numbers, and hyphens only)"
                .to_string(),
        ));
    }

    let tools = state.catalog.list_tools().await?;
    if tools.iter().any(|t| t.name == slug && t.id != tool.id) {
        return Err(AppError::Conflict(slug));
    }

    tool.name = slug;
    state.catalog.upsert_tool(&tool).await?;
    metrics::counter!("tool_saves_total").increment(1);

    Ok(Json(json!({ "success": true })))
}
