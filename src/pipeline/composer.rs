//! Prompt composition: deterministic assembly of the single instruction
//! block sent to the model. No network calls, no randomness.

use crate::spec::{DataType, SampleSet, TableMetadata, ToolSpecification};
use serde_json::{json, Value};
use std::fmt::Write;

pub struct ComposeInput<'a> {
    pub data_type: DataType,
    pub name: &'a str,
    pub db_name: &'a str,
    pub sample: &'a SampleSet,
    pub user_prompt: Option<&'a str>,
    pub existing_spec: Option<&'a ToolSpecification>,
}

/// Rules the model must honor for table sources. Collections carry no
/// structural metadata, so none of this applies to them.
fn push_table_rules(out: &mut String) {
    out.push_str(
        "IMPORTANT: Consider ONLY the partition keys, clustering (sort) keys and indexed \
         columns as parameters.\n\
         IMPORTANT: Partition keys are mandatory parameters (required=true).\n\
         IMPORTANT: For indexed date time or timestamp columns, generate \
         start_<column_name> and end_<column_name> parameters using the $gt and $lte \
         operators.\n\
         IMPORTANT: For indexed numeric columns, generate min_<column_name> and \
         max_<column_name> parameters using the $gte and $lte operators.\n\
         IMPORTANT: If a column is a vector column, set the embedding_model to \
         text-embedding-3-small.\n\n",
    );
}

fn table_schema_json(meta: &TableMetadata) -> Value {
    json!({
        "columns": meta.columns,
        "primaryKey": {
            "partitionBy": meta.partition_keys,
            "partitionSort": meta.clustering_keys,
        },
        "indexes": meta
            .indexes
            .iter()
            .map(|idx| json!({ "name": idx.name, "column": idx.column }))
            .collect::<Vec<_>>(),
    })
}

/// Assemble the instruction block for one generation request.
pub fn compose_instruction(input: &ComposeInput<'_>) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "You are given a {} structure and sample data. Based on them, generate a \
         comprehensive database query tool specification as a JSON object.",
        input.data_type
    );
    out.push_str(
        "Write descriptions so that a language model can understand and use the tool. \
         Use the sample data to identify data types, patterns and enums.\n\n",
    );

    if input.data_type == DataType::Table {
        push_table_rules(&mut out);
    }

    out.push_str(
        "IMPORTANT: Return ONLY valid JSON without any markdown formatting, code \
         blocks, or additional text.\n\n",
    );

    if let Some(meta) = &input.sample.table_metadata {
        let schema = serde_json::to_string_pretty(&table_schema_json(meta))
            .unwrap_or_else(|_| "{}".to_string());
        let _ = writeln!(
            out,
            "Table schema (columns, partition keys, sort keys, indexes):\n{schema}\n"
        );
        let _ = writeln!(
            out,
            "Eligible parameter columns: {}\n",
            meta.filterable_columns().join(", ")
        );
    }

    let _ = writeln!(
        out,
        "User Request:\n{}\n",
        input
            .user_prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or("No additional instructions provided.")
    );

    if let Some(existing) = input.existing_spec {
        let prior = serde_json::to_string_pretty(existing).unwrap_or_else(|_| "{}".to_string());
        let _ = writeln!(
            out,
            "Existing Tool Spec (update this based on the new request):\n{prior}\n"
        );
    }

    let _ = writeln!(out, "{} Name: {}", input.data_type, input.name);
    let _ = writeln!(
        out,
        "Available Attributes: {}\n",
        input.sample.attributes.join(", ")
    );

    let samples = serde_json::to_string_pretty(&input.sample.sample_data)
        .unwrap_or_else(|_| "[]".to_string());
    let _ = writeln!(out, "Sample Documents (first 5):\n{samples}\n");

    let _ = writeln!(
        out,
        r#"Generate a tool specification JSON with the following structure:
{{
  "name": "descriptive_tool_name",
  "description": "Clear description of what this tool does",
  "type": "tool",
  "method": "find",
  "{identity}": "{name}",
  "db_name": "{db}",
  "parameters": [
    {{
      "param": "parameter_name",
      "paramMode": "tool_param",
      "type": "string|number|boolean|text|timestamp|float|vector",
      "description": "Parameter description",
      "attribute": "attribute_name_from_list",
      "operator": "$eq|$gt|$gte|$lt|$lte|$in|$ne",
      "required": true|false,
      "info": "Why the parameter was considered, e.g. it is an indexed column, a partition key or any other reason."
    }}
  ],
  "projection": {{
    "attribute_name": 1
  }},
  "limit": 10,
  "enabled": true,
  "tags": ["relevant", "tags"]
}}"#,
        identity = input.data_type.identity_field(),
        name = input.name,
        db = input.db_name,
    );
    out.push_str("\nReturn ONLY valid JSON, no markdown, no explanations.");

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::IndexDescriptor;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn collection_sample() -> SampleSet {
        SampleSet {
            sample_data: vec![json!({ "status": "open", "total": 12.5 })],
            attributes: vec!["status".into(), "total".into()],
            table_metadata: None,
        }
    }

    fn table_sample() -> SampleSet {
        let mut columns = BTreeMap::new();
        columns.insert("tenant".to_string(), "text".to_string());
        columns.insert("created_at".to_string(), "timestamp".to_string());
        columns.insert("note".to_string(), "text".to_string());
        SampleSet {
            sample_data: vec![json!({ "tenant": "acme" })],
            attributes: vec!["created_at".into(), "note".into(), "tenant".into()],
            table_metadata: Some(TableMetadata {
                name: "events".into(),
                columns,
                partition_keys: vec!["tenant".into()],
                clustering_keys: vec!["created_at".into()],
                indexes: vec![IndexDescriptor {
                    name: "events_created_idx".into(),
                    column: "created_at".into(),
                }],
            }),
        }
    }

    #[test]
    fn collection_instruction_has_no_table_rules() {
        let sample = collection_sample();
        let instruction = compose_instruction(&ComposeInput {
            data_type: DataType::Collection,
            name: "orders",
            db_name: "app",
            sample: &sample,
            user_prompt: Some("filter by status"),
            existing_spec: None,
        });
        assert!(instruction.contains("collection Name: orders"));
        assert!(instruction.contains("\"collection_name\": \"orders\""));
        assert!(instruction.contains("filter by status"));
        assert!(!instruction.contains("Partition keys are mandatory"));
        assert!(instruction.contains("Return ONLY valid JSON"));
    }

    #[test]
    fn table_instruction_restricts_parameters_to_keys_and_indexes() {
        let sample = table_sample();
        let instruction = compose_instruction(&ComposeInput {
            data_type: DataType::Table,
            name: "events",
            db_name: "app",
            sample: &sample,
            user_prompt: None,
            existing_spec: None,
        });
        assert!(instruction.contains("Partition keys are mandatory parameters"));
        assert!(instruction.contains(
            "Consider ONLY the partition keys, clustering (sort) keys and indexed columns"
        ));
        assert!(instruction.contains("start_<column_name> and end_<column_name>"));
        assert!(instruction.contains("text-embedding-3-small"));
        // The partition key is listed as eligible; the non-indexed column
        // is not.
        assert!(instruction.contains("\"partitionBy\""));
        assert!(instruction.contains("Eligible parameter columns: tenant, created_at"));
        assert!(!instruction.contains("Eligible parameter columns: tenant, created_at, note"));
    }

    #[test]
    fn existing_spec_is_embedded_verbatim() {
        let sample = collection_sample();
        let existing: ToolSpecification = serde_json::from_value(json!({
            "name": "find-orders",
            "description": "Find orders by status",
            "collection_name": "orders",
            "db_name": "app"
        }))
        .unwrap();
        let instruction = compose_instruction(&ComposeInput {
            data_type: DataType::Collection,
            name: "orders",
            db_name: "app",
            sample: &sample,
            user_prompt: Some("also filter by total"),
            existing_spec: Some(&existing),
        });
        assert!(instruction.contains("Existing Tool Spec (update this based on the new request):"));
        assert!(instruction.contains("\"name\": \"find-orders\""));
    }

    #[test]
    fn empty_prompt_falls_back_to_placeholder() {
        let sample = collection_sample();
        let instruction = compose_instruction(&ComposeInput {
            data_type: DataType::Collection,
            name: "orders",
            db_name: "app",
            sample: &sample,
            user_prompt: Some("   "),
            existing_spec: None,
        });
        assert!(instruction.contains("No additional instructions provided."));
    }

    #[test]
    fn composition_is_deterministic() {
        let sample = table_sample();
        let input = ComposeInput {
            data_type: DataType::Table,
            name: "events",
            db_name: "app",
            sample: &sample,
            user_prompt: Some("recent events"),
            existing_spec: None,
        };
        assert_eq!(compose_instruction(&input), compose_instruction(&input));
    }
}
