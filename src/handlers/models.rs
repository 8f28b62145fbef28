use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_LIMIT: usize = 6;
const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    pub limit: Option<usize>,
}

/// GET /api/llm-models - Aggregate model listing across providers.
///
/// Providers are queried concurrently; each reports its own optional
/// error so one outage never empties the whole picker.
pub async fn list_models_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelsQuery>,
) -> Json<Value> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let listing = state.providers.list_all(limit).await;

    Json(json!({
        "success": true,
        "defaultModel": listing.default_model,
        "providers": {
            "openai": listing.openai,
            "anthropic": listing.anthropic,
            "watsonx": listing.watsonx,
        },
    }))
}
