//! IBM watsonx.ai. Every call first exchanges the API key for a
//! short-lived IAM bearer token.

use super::{is_non_chat_model, CompletionRequest, ProviderModels};
use crate::config::WatsonxConfig;
use crate::error::{AppError, Result};
use serde_json::{json, Value};

const IAM_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";
const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";
const API_VERSION: &str = "2024-03-20";
const MAX_NEW_TOKENS: u32 = 4096;

pub struct WatsonxClient {
    http: reqwest::Client,
    config: WatsonxConfig,
}

impl WatsonxClient {
    pub fn new(http: reqwest::Client, config: WatsonxConfig) -> Self {
        Self { http, config }
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let api_key = self
            .config
            .provider
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Upstream("WATSONX_API_KEY is not configured".to_string()))?;
        let url = self
            .config
            .url
            .as_deref()
            .ok_or_else(|| AppError::Upstream("WATSONX_URL is not configured".to_string()))?;
        Ok((api_key, url.trim_end_matches('/')))
    }

    /// Keys can carry form-reserved characters, so the body goes through
    /// the form encoder rather than string interpolation.
    fn iam_request(&self, api_key: &str) -> reqwest::RequestBuilder {
        self.http
            .post(IAM_TOKEN_URL)
            .form(&[("grant_type", IAM_GRANT_TYPE), ("apikey", api_key)])
    }

    async fn iam_token(&self, api_key: &str) -> Result<String> {
        let response = self.iam_request(api_key).send().await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Watsonx IAM error: {text}")));
        }

        let payload: Value = response.json().await?;
        payload
            .get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::Upstream("Watsonx IAM token missing access_token".to_string())
            })
    }

    pub async fn complete(&self, model_id: &str, request: &CompletionRequest) -> Result<String> {
        let (api_key, url) = self.credentials()?;
        let project_id = self.config.project_id.as_deref().ok_or_else(|| {
            AppError::Upstream("WATSONX_PROJECT_ID is not configured".to_string())
        })?;
        let token = self.iam_token(api_key).await?;

        let body = json!({
            "model_id": model_id,
            "project_id": project_id,
            "input": format!("{}\n\n{}", request.system, request.instruction),
            "parameters": { "max_new_tokens": MAX_NEW_TOKENS },
        });

        let response = self
            .http
            .post(format!("{url}/ml/v1/text/generation?version={API_VERSION}"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Watsonx API error ({status}): {text}"
            )));
        }

        let payload: Value = response.json().await?;
        let content = payload
            .pointer("/results/0/generated_text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(AppError::Upstream("No response from Watsonx".to_string()));
        }
        Ok(content.to_string())
    }

    /// List foundation models, allow-list first, live query otherwise.
    pub async fn list_models(&self, limit: usize) -> ProviderModels {
        let (Some(api_key), Some(url), true) = (
            self.config.provider.api_key.as_deref(),
            self.config.url.as_deref(),
            self.config.provider.models_configured,
        ) else {
            return ProviderModels::default();
        };
        if !self.config.provider.models.is_empty() {
            return ProviderModels {
                models: self
                    .config
                    .provider
                    .models
                    .iter()
                    .take(limit)
                    .cloned()
                    .collect(),
                error: None,
            };
        }

        let token = match self.iam_token(api_key).await {
            Ok(t) => t,
            Err(e) => return ProviderModels::failed(e.to_string()),
        };

        let response = match self
            .http
            .get(format!(
                "{}/ml/v1/models?version={API_VERSION}",
                url.trim_end_matches('/')
            ))
            .bearer_auth(&token)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return ProviderModels::failed(format!("Failed to list Watsonx models: {e}")),
        };
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return ProviderModels::failed(format!("Watsonx models error: {text}"));
        }
        let payload: Value = match response.json().await {
            Ok(p) => p,
            Err(e) => return ProviderModels::failed(format!("Failed to list Watsonx models: {e}")),
        };

        let mut models: Vec<String> = payload
            .get("resources")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|m| {
                        m.get("model_id")
                            .or_else(|| m.get("name"))
                            .or_else(|| m.get("id"))
                            .and_then(Value::as_str)
                    })
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatsonxConfig;

    fn client() -> WatsonxClient {
        WatsonxClient::new(reqwest::Client::new(), WatsonxConfig::default())
    }

    #[test]
    fn iam_request_percent_encodes_the_api_key() {
        let request = client().iam_request("k&y=+1").build().unwrap();
        let body = std::str::from_utf8(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert!(body.contains("apikey=k%26y%3D%2B1"), "body was {body}");
        assert!(body.contains("grant_type=urn%3Aibm%3Aparams%3Aoauth%3Agrant-type%3Aapikey"));
    }

    #[test]
    fn iam_request_is_form_encoded() {
        let request = client().iam_request("key").build().unwrap();
        assert_eq!(
            request
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[tokio::test]
    async fn listing_is_skipped_without_credentials() {
        let listing = client().list_models(5).await;
        assert!(listing.models.is_empty());
        assert!(listing.error.is_none());
    }
}
