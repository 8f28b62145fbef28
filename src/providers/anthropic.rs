//! Anthropic messages API. No native JSON-schema response mode, so the
//! instruction's layout mandate plus the two-tier parser carry the load.

use super::{is_non_chat_model, CompletionRequest, ProviderModels};
use crate::config::ProviderConfig;
use crate::error::{AppError, Result};
use serde_json::{json, Value};

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

pub struct AnthropicClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl AnthropicClient {
    pub fn new(http: reqwest::Client, config: ProviderConfig) -> Self {
        Self { http, config }
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Upstream("ANTHROPIC_API_KEY is not configured".to_string()))
    }

    pub async fn complete(&self, model_id: &str, request: &CompletionRequest) -> Result<String> {
        let api_key = self.api_key()?;

        let body = json!({
            "model": model_id,
            "max_tokens": MAX_TOKENS,
            "system": request.system,
            "messages": [
                { "role": "user", "content": request.instruction },
            ],
        });

        let response = self
            .http
            .post(format!("{API_BASE}/messages"))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Anthropic API error ({status}): {text}"
            )));
        }

        let payload: Value = response.json().await?;
        let content = payload
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(AppError::Upstream("No response from Anthropic".to_string()));
        }
        Ok(content.to_string())
    }

    /// List models, allow-list first, live query otherwise.
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
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return ProviderModels::failed(format!("Failed to list Anthropic models: {e}"))
            }
        };
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return ProviderModels::failed(format!("Anthropic API error: {text}"));
        }
        let payload: Value = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                return ProviderModels::failed(format!("Failed to list Anthropic models: {e}"))
            }
        };

        let mut models: Vec<String> = payload
            .get("data")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|m| m.get("id").and_then(Value::as_str))
                    .filter(|id| !is_non_chat_model(id))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        models.sort();
        models.truncate(limit);

        ProviderModels {
            models,
            error: None,
        }
    }
}
