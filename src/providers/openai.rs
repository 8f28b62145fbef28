//! OpenAI chat completions with native JSON-schema output enforcement.

use super::{is_non_chat_model, CompletionRequest, ProviderModels};
use crate::config::ProviderConfig;
use crate::error::{AppError, Result};
use serde_json::{json, Value};

const API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAiClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, config: ProviderConfig) -> Self {
        Self { http, config }
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Upstream("OPENAI_API_KEY is not configured".to_string()))
    }

    pub async fn complete(&self, model_id: &str, request: &CompletionRequest) -> Result<String> {
        let api_key = self.api_key()?;

        let body = json!({
            "model": model_id,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.instruction },
            ],
            "temperature": 0.3,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "tool_spec",
                    "schema": request.schema,
                }
            }
        });

        let response = self
            .http
            .post(format!("{API_BASE}/chat/completions"))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "OpenAI API error ({status}): {text}"
            )));
        }

        let payload: Value = response.json().await?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(AppError::Upstream("No response from OpenAI".to_string()));
        }
        Ok(content.to_string())
    }

    /// List chat-capable models, newest first. The configured allow-list
    /// takes precedence over a live query.
    pub async fn list_models(&self, limit: usize) -> ProviderModels {
        let (Some(api_key), true) = (self.config.api_key.as_deref(), self.config.models_configured)
        else {
            return ProviderModels::default();
        };
        if !self.config.models.is_empty() {
            return ProviderModels {
                models: self.config.models.iter().take(limit).cloned().collect(),
                error: None,
            };
        }

        let response = match self
            .http
            .get(format!("{API_BASE}/models"))
            .bearer_auth(api_key)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return ProviderModels::failed(format!("Failed to list OpenAI models: {e}")),
        };
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return ProviderModels::failed(format!("OpenAI API error ({status}): {text}"));
        }
        let payload: Value = match response.json().await {
            Ok(p) => p,
            Err(e) => return ProviderModels::failed(format!("Failed to list OpenAI models: {e}")),
        };

        let mut entries: Vec<(i64, String)> = payload
            .get("data")
            .and_then(Value::as_array)
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| {
                        let id = m.get("id").and_then(Value::as_str)?;
                        let created = m.get("created").and_then(Value::as_i64)?;
                        (!is_non_chat_model(id)).then(|| (created, id.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        entries.sort_by(|a, b| b.0.cmp(&a.0));

        ProviderModels {
            models: entries.into_iter().take(limit).map(|(_, id)| id).collect(),
            error: None,
        }
    }
}
