//! Specification reconciliation: force the requested data-source identity
//! onto the generated document, normalize the tool name into a slug, and
//! check the slug for collisions against the catalog.
//!
//! Performs one catalog read and no writes; persistence happens only on
//! explicit save.

use super::GenerateRequest;
use crate::error::{AppError, Result};
use crate::slug::{is_valid_slug, to_slug};
use crate::spec::{DataType, ToolSpecification};
use crate::store::CatalogStore;

pub async fn reconcile(
    mut spec: ToolSpecification,
    request: &GenerateRequest,
    catalog: &dyn CatalogStore,
    default_db: &str,
) -> Result<ToolSpecification> {
    // The requested identity always wins over whatever the model returned.
    match request.data_type {
        DataType::Collection => {
            spec.collection_name = Some(request.name.clone());
            spec.table_name = None;
        }
        DataType::Table => {
            spec.table_name = Some(request.name.clone());
            spec.collection_name = None;
        }
    }
    spec.db_name = request
        .db_name
        .clone()
        .filter(|db| !db.is_empty())
        .unwrap_or_else(|| default_db.to_string());
    spec.kind = "tool".to_string();
    spec.id = None;

    let slug = to_slug(&spec.name);
    if is_valid_slug(&slug) {
        // Only model-named tools are checked for collisions; the fallback
        // name is the caller's own source name and stays editable.
        let tools = catalog.list_tools().await?;
        if tools.iter().any(|t| t.name == slug) {
            return Err(AppError::Conflict(slug));
        }
        spec.name = slug;
    } else {
        let fallback = to_slug(&request.name);
        if !is_valid_slug(&fallback) {
            return Err(AppError::Validation(format!(
                "Could not derive a valid slug from \"{}\"",
                request.name
            )));
        }
        spec.name = fallback;
    }

    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct FakeCatalog {
        tools: Vec<ToolSpecification>,
    }

    #[async_trait]
    impl CatalogStore for FakeCatalog {
        async fn list_tools(&self) -> Result<Vec<ToolSpecification>> {
            Ok(self.tools.clone())
        }

        async fn upsert_tool(&self, _tool: &ToolSpecification) -> Result<()> {
            panic!("reconciliation must not persist");
        }
    }

    fn request(data_type: DataType, name: &str) -> GenerateRequest {
        GenerateRequest {
            data_type,
            name: name.to_string(),
            db_name: None,
            prompt: None,
            existing_tool_spec: None,
            model: None,
        }
    }

    fn generated(name: &str) -> ToolSpecification {
        serde_json::from_value(json!({
            "name": name,
            "description": "d",
            "collection_name": "whatever-the-model-said",
            "db_name": "model-db",
        }))
        .unwrap()
    }

    fn stored(name: &str) -> ToolSpecification {
        serde_json::from_value(json!({ "_id": "abc123", "name": name })).unwrap()
    }

    #[tokio::test]
    async fn forces_identity_fields_from_request() {
        let catalog = FakeCatalog { tools: vec![] };
        let spec = reconcile(
            generated("Find Orders"),
            &request(DataType::Table, "events"),
            &catalog,
            "default-db",
        )
        .await
        .unwrap();

        assert_eq!(spec.table_name.as_deref(), Some("events"));
        assert!(spec.collection_name.is_none());
        assert_eq!(spec.db_name, "default-db");
        assert_eq!(spec.kind, "tool");
        assert!(spec.enabled);
        assert_eq!(spec.name, "find-orders");
    }

    #[tokio::test]
    async fn name_collision_is_a_conflict() {
        let catalog = FakeCatalog {
            tools: vec![stored("find-orders")],
        };
        let err = reconcile(
            generated("Find Orders"),
            &request(DataType::Collection, "orders"),
            &catalog,
            "db",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(err.to_string().contains("find-orders"));
    }

    #[tokio::test]
    async fn collision_check_is_case_sensitive_exact_match() {
        let catalog = FakeCatalog {
            tools: vec![stored("find-orders-v2")],
        };
        let spec = reconcile(
            generated("Find Orders"),
            &request(DataType::Collection, "orders"),
            &catalog,
            "db",
        )
        .await
        .unwrap();
        assert_eq!(spec.name, "find-orders");
    }

    #[tokio::test]
    async fn unusable_model_name_falls_back_to_source_name() {
        let catalog = FakeCatalog { tools: vec![] };
        let spec = reconcile(
            generated("!!!"),
            &request(DataType::Collection, "order_history"),
            &catalog,
            "db",
        )
        .await
        .unwrap();
        assert_eq!(spec.name, "order-history");
    }

    #[tokio::test]
    async fn requested_db_name_overrides_default() {
        let catalog = FakeCatalog { tools: vec![] };
        let mut req = request(DataType::Collection, "orders");
        req.db_name = Some("tenant-db".to_string());
        let spec = reconcile(generated("Find Orders"), &req, &catalog, "db")
            .await
            .unwrap();
        assert_eq!(spec.db_name, "tenant-db");
    }
}
