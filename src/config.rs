use anyhow::Context;
use std::env;

/// Astra DB Data API connection settings.
#[derive(Debug, Clone)]
pub struct AstraConfig {
    /// Base URL of the Data API, e.g. `https://<db-id>-<region>.apps.astra.datastax.com`.
    pub endpoint: String,
    /// Application token sent as the `Token` header.
    pub token: String,
    /// Default keyspace used when a request carries no `dbName`.
    pub db_name: String,
    /// Collection holding saved tool specifications.
    pub tools_collection: String,
}

/// Credentials and model allow-list for one language-model provider.
///
/// A provider is considered enabled only when both the API key and the
/// allow-list variable are set. A non-empty allow-list takes precedence
/// over a live model query against the provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub models: Vec<String>,
    pub models_configured: bool,
}

impl ProviderConfig {
    fn from_env(key_var: &str, models_var: &str) -> Self {
        let api_key = env::var(key_var).ok().filter(|k| !k.is_empty());
        let raw = env::var(models_var).ok();
        let models_configured = raw.is_some();
        let models = raw
            .map(|v| {
                v.split(',')
                    .map(|entry| entry.trim().to_string())
                    .filter(|entry| !entry.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            api_key,
            models,
            models_configured,
        }
    }
}

/// watsonx needs a regional base URL and a project id on top of the key.
#[derive(Debug, Clone, Default)]
pub struct WatsonxConfig {
    pub provider: ProviderConfig,
    pub url: Option<String>,
    pub project_id: Option<String>,
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    /// Bound on every outbound HTTP call (Astra and model providers).
    pub request_timeout_secs: u64,
    pub astra: AstraConfig,
    /// Fallback model selector, `provider:model` or a bare OpenAI model id.
    pub default_model: String,
    pub openai: ProviderConfig,
    pub anthropic: ProviderConfig,
    pub watsonx: WatsonxConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Astra credentials are required at startup; provider credentials are
    /// optional and checked per-request so a partially configured instance
    /// can still serve the catalog endpoints.
    pub fn from_env() -> anyhow::Result<Self> {
        let endpoint = env::var("ASTRA_DB_API_ENDPOINT")
            .context("ASTRA_DB_API_ENDPOINT must be set")?;
        let token = env::var("ASTRA_DB_APPLICATION_TOKEN")
            .context("ASTRA_DB_APPLICATION_TOKEN must be set")?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            shutdown_timeout_secs: env::var("SHUTDOWN_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            request_timeout_secs: env::var("REQUEST_TIMEOUT")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,
            astra: AstraConfig {
                endpoint,
                token,
                db_name: env::var("ASTRA_DB_DB_NAME")
                    .unwrap_or_else(|_| "default_keyspace".to_string()),
                tools_collection: env::var("ASTRA_DB_TOOLS_COLLECTION")
                    .unwrap_or_else(|_| "tools".to_string()),
            },
            default_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai: ProviderConfig::from_env("OPENAI_API_KEY", "OPENAI_MODELS"),
            anthropic: ProviderConfig::from_env("ANTHROPIC_API_KEY", "ANTHROPIC_MODELS"),
            watsonx: WatsonxConfig {
                provider: ProviderConfig::from_env("WATSONX_API_KEY", "IBM_WATSON_MODELS"),
                url: env::var("WATSONX_URL").ok().filter(|u| !u.is_empty()),
                project_id: env::var("WATSONX_PROJECT_ID").ok().filter(|p| !p.is_empty()),
            },
        })
    }
}
