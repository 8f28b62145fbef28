//! Schema sampling: a bounded read of the data source that yields sample
//! records, the attribute list, and (for tables) structural metadata.

use crate::error::{AppError, Result};
use crate::spec::{DataType, SampleSet};
use crate::store::DataSource;
use serde_json::Value;
use std::collections::BTreeSet;

/// Raw records fetched per request.
pub const SAMPLE_FETCH_LIMIT: usize = 10;
/// Records kept for prompt inclusion.
pub const SAMPLE_PROMPT_LIMIT: usize = 5;

/// Store identity field stripped from samples before they reach the model.
const IDENTITY_FIELD: &str = "_id";

/// Sample a data source.
///
/// Fails with `NotFound` when the source holds no records; for tables the
/// declared column names are unioned into the attribute set so columns
/// absent from the sampled rows still surface.
pub async fn sample(
    source: &dyn DataSource,
    data_type: DataType,
    name: &str,
    db_name: &str,
) -> Result<SampleSet> {
    let documents = source
        .fetch_documents(data_type, name, db_name, SAMPLE_FETCH_LIMIT)
        .await?;
    if documents.is_empty() {
        return Err(AppError::NotFound {
            data_type: data_type.to_string(),
            name: name.to_string(),
        });
    }

    let mut attributes: BTreeSet<String> = documents
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|doc| doc.keys().cloned())
        .filter(|key| key != IDENTITY_FIELD)
        .collect();

    let table_metadata = match data_type {
        DataType::Table => source.fetch_table_metadata(name, db_name).await?,
        DataType::Collection => None,
    };
    if let Some(meta) = &table_metadata {
        attributes.extend(meta.columns.keys().cloned());
    }

    let sample_data = documents
        .into_iter()
        .take(SAMPLE_PROMPT_LIMIT)
        .map(|mut doc| {
            if let Some(obj) = doc.as_object_mut() {
                obj.remove(IDENTITY_FIELD);
            }
            doc
        })
        .collect();

    Ok(SampleSet {
        sample_data,
        attributes: attributes.into_iter().collect(),
        table_metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::TableMetadata;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;

    struct FakeSource {
        documents: Vec<Value>,
        metadata: Option<TableMetadata>,
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

    #[tokio::test]
    async fn empty_source_is_not_found() {
        let source = FakeSource {
            documents: vec![],
            metadata: None,
        };
        let err = sample(&source, DataType::Collection, "orders", "")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No documents found in collection \"orders\""
        );
    }

    #[tokio::test]
    async fn strips_identity_and_truncates() {
        let documents: Vec<Value> = (0..8)
            .map(|i| json!({ "_id": format!("id-{i}"), "status": "open", "total": i }))
            .collect();
        let source = FakeSource {
            documents,
            metadata: None,
        };

        let set = sample(&source, DataType::Collection, "orders", "")
            .await
            .unwrap();
        assert_eq!(set.sample_data.len(), SAMPLE_PROMPT_LIMIT);
        for doc in &set.sample_data {
            assert!(doc.get("_id").is_none());
        }
        assert_eq!(set.attributes, vec!["status", "total"]);
    }

    #[tokio::test]
    async fn table_columns_union_into_attributes() {
        let mut columns = BTreeMap::new();
        columns.insert("tenant".to_string(), "text".to_string());
        columns.insert("created_at".to_string(), "timestamp".to_string());
        let source = FakeSource {
            documents: vec![json!({ "tenant": "acme" })],
            metadata: Some(TableMetadata {
                name: "events".into(),
                columns,
                partition_keys: vec!["tenant".into()],
                clustering_keys: vec![],
                indexes: vec![],
            }),
        };

        let set = sample(&source, DataType::Table, "events", "")
            .await
            .unwrap();
        assert_eq!(set.attributes, vec!["created_at", "tenant"]);
        assert!(set.table_metadata.is_some());
    }
}
