//! Shared fakes for the integration tests: in-memory collaborators and a
//! scripted completion backend, so no test touches the network.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use specforge::config::{AstraConfig, Config, ProviderConfig, WatsonxConfig};
use specforge::error::Result;
use specforge::providers::{CompletionBackend, CompletionRequest, ModelRef};
use specforge::spec::{DataType, TableMetadata, ToolSpecification};
use specforge::store::{CatalogStore, DataSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        shutdown_timeout_secs: 0,
        request_timeout_secs: 5,
        astra: AstraConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            token: "test-token".to_string(),
            db_name: "default-db".to_string(),
            tools_collection: "tools".to_string(),
        },
        default_model: "gpt-4o-mini".to_string(),
        openai: ProviderConfig::default(),
        anthropic: ProviderConfig::default(),
        watsonx: WatsonxConfig::default(),
    }
}

pub struct FakeSource {
    pub documents: Vec<Value>,
    pub metadata: Option<TableMetadata>,
}

#[async_trait]
impl DataSource for FakeSource {
    async fn fetch_documents(
        &self,
        _data_type: DataType,
        _name: &str,
        _db_name: &str,
        limit: usize,
    ) -> Result<Vec<Value>> {
        Ok(self.documents.iter().take(limit).cloned().collect())
    }

    async fn fetch_table_metadata(
        &self,
        _name: &str,
        _db_name: &str,
    ) -> Result<Option<TableMetadata>> {
        Ok(self.metadata.clone())
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    pub tools: Mutex<Vec<ToolSpecification>>,
}

impl FakeCatalog {
    pub fn with_tools(tools: Vec<ToolSpecification>) -> Self {
        Self {
            tools: Mutex::new(tools),
        }
    }

    pub fn saved(&self) -> Vec<ToolSpecification> {
        self.tools.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogStore for FakeCatalog {
    async fn list_tools(&self) -> Result<Vec<ToolSpecification>> {
        Ok(self.tools.lock().unwrap().clone())
    }

    async fn upsert_tool(&self, tool: &ToolSpecification) -> Result<()> {
        let mut tools = self.tools.lock().unwrap();
        if let Some(existing) = tools.iter_mut().find(|t| t.name == tool.name) {
            *existing = tool.clone();
        } else {
            tools.push(tool.clone());
        }
        Ok(())
    }
}

/// Scripted model backend; counts calls so tests can assert the pipeline
/// short-circuited before any completion.
pub struct FakeBackend {
    pub reply: String,
    pub calls: AtomicUsize,
}

impl FakeBackend {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for FakeBackend {
    async fn complete(&self, _model: &ModelRef, _request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}
