//! Language-model providers: completion routing and model listing.
//!
//! A model selector is `provider:model` (bare ids default to OpenAI).
//! Completion requests are dispatched through [`CompletionBackend`] so the
//! pipeline can be tested with a scripted fake; [`ProviderRouter`] is the
//! production implementation, holding one client per provider.

mod anthropic;
mod openai;
mod watsonx;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;
pub use watsonx::WatsonxClient;

use crate::config::Config;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Watsonx,
}

/// A parsed model selector.
#[derive(Debug, Clone)]
pub struct ModelRef {
    pub provider: Provider,
    pub model_id: String,
}

impl ModelRef {
    /// Parse `provider:model`. A bare model id is treated as OpenAI, which
    /// is what older clients send.
    pub fn parse(selector: &str) -> Result<Self> {
        let (provider, model_id) = match selector.split_once(':') {
            Some((prefix, id)) => {
                let provider = match prefix {
                    "openai" => Provider::OpenAi,
                    "anthropic" => Provider::Anthropic,
                    "watsonx" => Provider::Watsonx,
                    other => {
                        return Err(AppError::Validation(format!(
                            "Unknown model provider \"{other}\""
                        )))
                    }
                };
                (provider, id)
            }
            None => (Provider::OpenAi, selector),
        };
        if model_id.is_empty() {
            return Err(AppError::Validation("Model id cannot be empty".to_string()));
        }
        Ok(Self {
            provider,
            model_id: model_id.to_string(),
        })
    }
}

/// One JSON-schema-constrained completion request.
pub struct CompletionRequest {
    pub system: String,
    pub instruction: String,
    /// JSON schema the reply must conform to. Providers without native
    /// schema enforcement rely on the instruction's layout mandate.
    pub schema: Value,
}

/// Seam between the generation pipeline and the model providers.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send one completion request and return the raw text reply.
    async fn complete(&self, model: &ModelRef, request: &CompletionRequest) -> Result<String>;
}

/// Models available from one provider, with an optional per-provider
/// error so one failing provider does not sink the whole listing.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ProviderModels {
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderModels {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            models: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// Aggregate listing across all providers.
#[derive(Debug, Serialize)]
pub struct ModelListing {
    pub default_model: String,
    pub openai: ProviderModels,
    pub anthropic: ProviderModels,
    pub watsonx: ProviderModels,
}

/// Model ids that are not chat/completion models and should never be
/// offered in the picker.
pub(crate) fn is_non_chat_model(id: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(audio|speech|tts|image|vision|dall-e|whisper|realtime|transcribe)")
            .expect("valid regex")
    })
    .is_match(id)
}

pub struct ProviderRouter {
    openai: OpenAiClient,
    anthropic: AnthropicClient,
    watsonx: WatsonxClient,
}

impl ProviderRouter {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Upstream(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            openai: OpenAiClient::new(http.clone(), config.openai.clone()),
            anthropic: AnthropicClient::new(http.clone(), config.anthropic.clone()),
            watsonx: WatsonxClient::new(http, config.watsonx.clone()),
        })
    }

    /// Query all providers concurrently and nominate a default model:
    /// the first available one in fixed provider priority order.
    pub async fn list_all(&self, limit: usize) -> ModelListing {
        let (openai, anthropic, watsonx) = tokio::join!(
            self.openai.list_models(limit),
            self.anthropic.list_models(limit),
            self.watsonx.list_models(limit),
        );

        let default_model = openai
            .models
            .first()
            .map(|m| format!("openai:{m}"))
            .or_else(|| anthropic.models.first().map(|m| format!("anthropic:{m}")))
            .or_else(|| watsonx.models.first().map(|m| format!("watsonx:{m}")))
            .unwrap_or_default();

        ModelListing {
            default_model,
            openai,
            anthropic,
            watsonx,
        }
    }
}

#[async_trait]
impl CompletionBackend for ProviderRouter {
    async fn complete(&self, model: &ModelRef, request: &CompletionRequest) -> Result<String> {
        match model.provider {
            Provider::OpenAi => self.openai.complete(&model.model_id, request).await,
            Provider::Anthropic => self.anthropic.complete(&model.model_id, request).await,
            Provider::Watsonx => self.watsonx.complete(&model.model_id, request).await,
        }
    }
}
