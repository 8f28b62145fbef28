//! Specification generation: one schema-constrained model call and the
//! parsing of its reply into a typed specification.
//!
//! Parsing is two-tier: direct JSON first, then the contents of a fenced
//! code block. Some models wrap JSON in formatting despite instructions,
//! and the fallback keeps those replies usable. No retry on failure; the
//! caller re-triggers manually.

use crate::error::{AppError, Result};
use crate::providers::{CompletionBackend, CompletionRequest, ModelRef};
use crate::spec::{DataType, ToolSpecification};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

const SYSTEM_PROMPT: &str = "You are an expert at creating database query tool \
    specifications. Always return valid JSON only, no markdown formatting.";

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("valid regex"))
}

/// JSON schema the model output must conform to. The identity field
/// required depends on the data-source kind.
pub fn response_schema(data_type: DataType) -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": [
            "name",
            "description",
            "type",
            "method",
            data_type.identity_field(),
            "db_name",
            "parameters",
            "projection",
            "limit",
            "enabled",
            "tags",
        ],
        "properties": {
            "name": { "type": "string" },
            "description": { "type": "string" },
            "type": { "type": "string" },
            "method": { "type": "string" },
            "collection_name": { "type": "string" },
            "table_name": { "type": "string" },
            "db_name": { "type": "string" },
            "parameters": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": [
                        "param",
                        "paramMode",
                        "type",
                        "description",
                        "attribute",
                        "operator",
                        "required",
                    ],
                    "properties": {
                        "param": { "type": "string" },
                        "paramMode": {
                            "type": "string",
                            "enum": ["tool_param", "static", "expression"],
                        },
                        "type": {
                            "type": "string",
                            "enum": ["string", "number", "boolean", "text", "timestamp", "float", "vector"],
                        },
                        "description": { "type": "string" },
                        "attribute": { "type": "string" },
                        "operator": {
                            "type": "string",
                            "enum": ["$eq", "$gt", "$gte", "$lt", "$lte", "$in", "$ne"],
                        },
                        "required": { "type": "boolean" },
                        "expr": { "type": "string" },
                        "value": {},
                        "info": { "type": "string" },
                    },
                },
            },
            "projection": {
                "type": "object",
                "additionalProperties": {
                    "anyOf": [{ "type": "number" }, { "type": "string" }],
                },
            },
            "limit": { "type": "number" },
            "enabled": { "type": "boolean" },
            "tags": {
                "type": "array",
                "items": { "type": "string" },
            },
            "embedding_model": { "type": "string" },
        },
    })
}

/// Parse a model reply into a JSON value plus any prose surrounding a
/// fenced block (surfaced to the console as an explanation).
pub fn parse_model_reply(reply: &str) -> Result<(Value, Option<String>)> {
    if let Ok(value) = serde_json::from_str(reply) {
        return Ok((value, None));
    }

    let Some(captures) = fence_re().captures(reply) else {
        return Err(AppError::Parse(
            "response is neither bare JSON nor a fenced code block".to_string(),
        ));
    };
    let fenced = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let value =
        serde_json::from_str(fenced).map_err(|e| AppError::Parse(format!("fenced block: {e}")))?;

    let whole = captures.get(0).map(|m| m.range()).unwrap_or(0..0);
    let mut prose = String::with_capacity(reply.len() - (whole.end - whole.start));
    prose.push_str(&reply[..whole.start]);
    prose.push_str(&reply[whole.end..]);
    let prose = prose.trim();
    let explanation = (!prose.is_empty()).then(|| prose.to_string());

    Ok((value, explanation))
}

/// Run one completion and deserialize the reply.
pub async fn generate(
    backend: &dyn CompletionBackend,
    model: &ModelRef,
    data_type: DataType,
    instruction: &str,
) -> Result<(ToolSpecification, Option<String>)> {
    let request = CompletionRequest {
        system: SYSTEM_PROMPT.to_string(),
        instruction: instruction.to_string(),
        schema: response_schema(data_type),
    };

    let reply = backend.complete(model, &request).await?;
    let (value, explanation) = parse_model_reply(&reply)?;
    let spec: ToolSpecification =
        serde_json::from_value(value).map_err(|e| AppError::Parse(e.to_string()))?;

    Ok((spec, explanation))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC_JSON: &str = r#"{
        "name": "find-orders",
        "description": "Find orders",
        "type": "tool",
        "method": "find",
        "collection_name": "orders",
        "db_name": "app",
        "parameters": [],
        "projection": {},
        "limit": 10,
        "enabled": true,
        "tags": []
    }"#;

    #[test]
    fn parses_bare_json() {
        let (value, explanation) = parse_model_reply(SPEC_JSON).unwrap();
        assert_eq!(value["name"], "find-orders");
        assert!(explanation.is_none());
    }

    #[test]
    fn parses_fenced_json_identically() {
        let fenced = format!("```json\n{SPEC_JSON}\n```");
        let (bare, _) = parse_model_reply(SPEC_JSON).unwrap();
        let (from_fence, _) = parse_model_reply(&fenced).unwrap();
        assert_eq!(bare, from_fence);
    }

    #[test]
    fn parses_fence_without_language_tag() {
        let fenced = format!("```\n{SPEC_JSON}\n```");
        let (value, _) = parse_model_reply(&fenced).unwrap();
        assert_eq!(value["name"], "find-orders");
    }

    #[test]
    fn surrounding_prose_becomes_explanation() {
        let reply = format!(
            "I focused the tool on order status.\n```json\n{SPEC_JSON}\n```\nLet me know."
        );
        let (value, explanation) = parse_model_reply(&reply).unwrap();
        assert_eq!(value["name"], "find-orders");
        let explanation = explanation.unwrap();
        assert!(explanation.contains("order status"));
        assert!(explanation.contains("Let me know."));
    }

    #[test]
    fn garbage_is_a_parse_failure() {
        let err = parse_model_reply("sorry, I cannot do that").unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn fenced_garbage_is_a_parse_failure() {
        let err = parse_model_reply("```json\nnot json\n```").unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn schema_requires_identity_field_by_kind() {
        let collection = response_schema(DataType::Collection);
        let table = response_schema(DataType::Table);
        let required = |s: &Value| {
            s["required"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap().to_string())
                .collect::<Vec<_>>()
        };
        assert!(required(&collection).contains(&"collection_name".to_string()));
        assert!(!required(&collection).contains(&"table_name".to_string()));
        assert!(required(&table).contains(&"table_name".to_string()));
    }
}
