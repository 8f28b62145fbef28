//! Data-store collaborators: sampling reads against collections and
//! tables, and the tool catalog.
//!
//! The pipeline and handlers talk to these through the [`DataSource`] and
//! [`CatalogStore`] traits so tests can substitute in-memory fakes; the
//! production implementation is [`AstraClient`], a thin wrapper over the
//! Astra DB Data API (JSON commands over HTTP).

use crate::config::AstraConfig;
use crate::error::{AppError, Result};
use crate::spec::{DataType, IndexDescriptor, TableMetadata, ToolSpecification};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Read access to the sampled data source. No mutation.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch up to `limit` raw records from the named collection or table.
    async fn fetch_documents(
        &self,
        data_type: DataType,
        name: &str,
        db_name: &str,
        limit: usize,
    ) -> Result<Vec<Value>>;

    /// Fetch structural metadata for a table, `None` if the table is not
    /// declared in the keyspace.
    async fn fetch_table_metadata(&self, name: &str, db_name: &str)
        -> Result<Option<TableMetadata>>;
}

/// Persistence for tool specifications.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolSpecification>>;

    /// Insert or replace a tool. Keyed by `_id` when present, otherwise by
    /// `name`. Uniqueness of `name` is checked by the caller before this
    /// write; the two are not atomic.
    async fn upsert_tool(&self, tool: &ToolSpecification) -> Result<()>;
}

/// Astra DB Data API client.
pub struct AstraClient {
    http: reqwest::Client,
    config: AstraConfig,
}

impl AstraClient {
    pub fn new(config: AstraConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Upstream(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// POST a Data API command to `/api/json/v1/{keyspace}[/{target}]`.
    async fn command(&self, keyspace: &str, target: Option<&str>, body: Value) -> Result<Value> {
        let mut url = format!(
            "{}/api/json/v1/{}",
            self.config.endpoint.trim_end_matches('/'),
            keyspace
        );
        if let Some(target) = target {
            url.push('/');
            url.push_str(target);
        }

        let response = self
            .http
            .post(&url)
            .header("Token", &self.config.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response.json().await?;

        // The Data API reports command failures in an `errors` array, with
        // HTTP 200 in most cases.
        if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
            if let Some(first) = errors.first() {
                let message = first
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown Data API error");
                return Err(AppError::Upstream(format!("Astra Data API error: {message}")));
            }
        }
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Astra Data API returned HTTP {status}"
            )));
        }

        Ok(payload)
    }

    fn keyspace<'a>(&'a self, db_name: &'a str) -> &'a str {
        if db_name.is_empty() {
            &self.config.db_name
        } else {
            db_name
        }
    }
}

#[async_trait]
impl DataSource for AstraClient {
    async fn fetch_documents(
        &self,
        _data_type: DataType,
        name: &str,
        db_name: &str,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let body = json!({ "find": { "options": { "limit": limit } } });
        let payload = self.command(self.keyspace(db_name), Some(name), body).await?;
        let documents = payload
            .pointer("/data/documents")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(documents)
    }

    async fn fetch_table_metadata(
        &self,
        name: &str,
        db_name: &str,
    ) -> Result<Option<TableMetadata>> {
        let keyspace = self.keyspace(db_name);
        let body = json!({ "listTables": { "options": { "explain": true } } });
        let payload = self.command(keyspace, None, body).await?;

        let tables = payload
            .pointer("/status/tables")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let Some(table) = tables
            .iter()
            .find(|t| t.get("name").and_then(Value::as_str) == Some(name))
        else {
            return Ok(None);
        };

        let definition = table.get("definition").cloned().unwrap_or(Value::Null);
        let mut columns = BTreeMap::new();
        if let Some(cols) = definition.get("columns").and_then(Value::as_object) {
            for (col, descriptor) in cols {
                let ty = descriptor
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                columns.insert(col.clone(), ty);
            }
        }

        let partition_keys = definition
            .pointer("/primaryKey/partitionBy")
            .and_then(Value::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let clustering_keys = definition
            .pointer("/primaryKey/partitionSort")
            .and_then(Value::as_object)
            .map(|sort| sort.keys().cloned().collect())
            .unwrap_or_default();

        // Secondary indexes live behind a per-table listIndexes command.
        let body = json!({ "listIndexes": { "options": { "explain": true } } });
        let payload = self.command(keyspace, Some(name), body).await?;
        let indexes = payload
            .pointer("/status/indexes")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|idx| {
                        let index_name = idx.get("name").and_then(Value::as_str)?;
                        let column = idx.pointer("/definition/column").and_then(Value::as_str)?;
                        Some(IndexDescriptor {
                            name: index_name.to_string(),
                            column: column.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(TableMetadata {
            name: name.to_string(),
            columns,
            partition_keys,
            clustering_keys,
            indexes,
        }))
    }
}

/// Split one `find` response into its documents and the cursor for the
/// next page, if the Data API reports one.
fn split_page(payload: &Value) -> (Vec<Value>, Option<String>) {
    let documents = payload
        .pointer("/data/documents")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let next = payload
        .pointer("/data/nextPageState")
        .and_then(Value::as_str)
        .map(str::to_string);
    (documents, next)
}

/// Drain a `find` cursor: `fetch` runs one page (taking the page state to
/// resume from) and the loop follows `nextPageState` until the Data API
/// stops returning one. The API caps each page at ~20 documents, so a
/// single `find` response is never the whole collection.
async fn collect_pages<F, Fut>(mut fetch: F) -> Result<Vec<Value>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: std::future::Future<Output = Result<Value>>,
{
    let mut all = Vec::new();
    let mut page_state: Option<String> = None;
    loop {
        let payload = fetch(page_state.take()).await?;
        let (mut documents, next) = split_page(&payload);
        all.append(&mut documents);
        match next {
            Some(state) => page_state = Some(state),
            None => break,
        }
    }
    Ok(all)
}

#[async_trait]
impl CatalogStore for AstraClient {
    async fn list_tools(&self) -> Result<Vec<ToolSpecification>> {
        let documents = collect_pages(|page_state| {
            let mut options = json!({ "limit": 1000 });
            if let Some(state) = page_state {
                options["pageState"] = json!(state);
            }
            self.command(
                &self.config.db_name,
                Some(&self.config.tools_collection),
                json!({ "find": { "options": options } }),
            )
        })
        .await?;

        let mut tools = Vec::with_capacity(documents.len());
        for doc in documents {
            let tool = serde_json::from_value(doc)
                .map_err(|e| AppError::Upstream(format!("Malformed tool in catalog: {e}")))?;
            tools.push(tool);
        }
        Ok(tools)
    }

    async fn upsert_tool(&self, tool: &ToolSpecification) -> Result<()> {
        let filter = match &tool.id {
            Some(id) => json!({ "_id": id }),
            None => json!({ "name": tool.name }),
        };
        let replacement = serde_json::to_value(tool)
            .map_err(|e| AppError::Upstream(format!("Failed to serialize tool: {e}")))?;
        let body = json!({
            "findOneAndReplace": {
                "filter": filter,
                "replacement": replacement,
                "options": { "upsert": true }
            }
        });
        self.command(&self.config.db_name, Some(&self.config.tools_collection), body)
            .await?;
        Ok(())
    }
}
