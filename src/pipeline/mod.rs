//! The tool-specification generation pipeline.
//!
//! One sequential pass per request:
//!
//! ```text
//! Sampler -> Composer -> Generator -> Reconciler
//! ```
//!
//! Sampling reads live data, composition is pure string assembly, the
//! generator makes the single model call, and the reconciler normalizes
//! the result against the catalog. Nothing here retries or persists;
//! saving is a separate, explicit operation.

pub mod composer;
pub mod generator;
pub mod reconciler;
pub mod sampler;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::providers::{CompletionBackend, ModelRef};
use crate::spec::{DataType, ToolSpecification};
use crate::store::{CatalogStore, DataSource};
use serde::Deserialize;

/// One generation request, as posted by the console.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub data_type: DataType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub db_name: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    /// Prior specification for iterative refinement. The caller passes the
    /// latest result back in; there is no server-side session state.
    #[serde(default)]
    pub existing_tool_spec: Option<ToolSpecification>,
    /// `provider:model` selector; falls back to the configured default.
    #[serde(default)]
    pub model: Option<String>,
}

/// Pipeline output: the reconciled specification, plus any prose the
/// model emitted around the JSON.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub tool_spec: ToolSpecification,
    pub explanation: Option<String>,
}

/// Run the full pipeline for one request.
pub async fn generate_tool_spec(
    config: &Config,
    source: &dyn DataSource,
    catalog: &dyn CatalogStore,
    backend: &dyn CompletionBackend,
    request: &GenerateRequest,
) -> Result<GenerationOutcome> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation(
            "Collection/table name and data type are required".to_string(),
        ));
    }

    let db_name = request.db_name.as_deref().unwrap_or("");
    let sample = sampler::sample(source, request.data_type, &request.name, db_name).await?;
    tracing::debug!(
        data_type = %request.data_type,
        name = %request.name,
        attributes = sample.attributes.len(),
        records = sample.sample_data.len(),
        "Sampled data source"
    );

    let instruction = composer::compose_instruction(&composer::ComposeInput {
        data_type: request.data_type,
        name: &request.name,
        db_name: if db_name.is_empty() {
            config.astra.db_name.as_str()
        } else {
            db_name
        },
        sample: &sample,
        user_prompt: request.prompt.as_deref(),
        existing_spec: request.existing_tool_spec.as_ref(),
    });

    let selector = request
        .model
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(&config.default_model);
    let model = ModelRef::parse(selector)?;

    let (raw_spec, explanation) =
        generator::generate(backend, &model, request.data_type, &instruction).await?;

    let tool_spec =
        reconciler::reconcile(raw_spec, request, catalog, &config.astra.db_name).await?;

    tracing::info!(tool = %tool_spec.name, model = %model.model_id, "Generated tool specification");

    Ok(GenerationOutcome {
        tool_spec,
        explanation,
    })
}
