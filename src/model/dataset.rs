//! Dataset definitions: what to query, and how to enrich it.
//!
//! Definitions are owned by the source configuration; this crate only reads
//! them.

use crate::constants::{
    DEFAULT_MERGE_FIELD, ENRICHMENT_BATCH_SIZE, ENRICHMENT_THROTTLE_MS, UPSTREAM_PAGE_SIZE,
};
use crate::error::AppError;
use crate::types::{DatasetId, FieldPath, QueryTemplate, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// The paginated query that produces a dataset's primary records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryQuery {
    /// Logical resource name (`product`, `order`, ...), used to find the
    /// payload field in responses.
    pub resource: String,
    /// GraphQL document taking `$first: Int!` and `$after: String`.
    pub query: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// A secondary lookup keyed by ids found in the primary records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentSpec {
    /// Where the ids live inside each primary record.
    pub id_path: FieldPath,
    pub query_template: QueryTemplate,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    #[serde(default = "default_merge_field")]
    pub merge_field: String,
}

impl EnrichmentSpec {
    pub fn new(id_path: FieldPath, query_template: QueryTemplate) -> Self {
        Self {
            id_path,
            query_template,
            batch_size: ENRICHMENT_BATCH_SIZE,
            throttle_ms: ENRICHMENT_THROTTLE_MS,
            merge_field: DEFAULT_MERGE_FIELD.to_string(),
        }
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

/// Everything needed to run one dataset's extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDefinition {
    pub id: DatasetId,
    #[serde(default)]
    pub name: Option<String>,
    pub primary: PrimaryQuery,
    #[serde(default)]
    pub enrichment: Option<EnrichmentSpec>,
}

impl DatasetDefinition {
    /// Checks bounds that serde alone cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.primary.resource.trim().is_empty() {
            return Err(ValidationError::EmptyField("primary.resource"));
        }
        if self.primary.query.trim().is_empty() {
            return Err(ValidationError::EmptyField("primary.query"));
        }
        if !(1..=250).contains(&self.primary.page_size) {
            return Err(ValidationError::OutOfBounds {
                value: u64::from(self.primary.page_size),
                min: 1,
                max: 250,
            });
        }
        if let Some(enrichment) = &self.enrichment {
            if enrichment.batch_size == 0 || enrichment.batch_size > 250 {
                return Err(ValidationError::OutOfBounds {
                    value: enrichment.batch_size as u64,
                    min: 1,
                    max: 250,
                });
            }
            if enrichment.merge_field.trim().is_empty() {
                return Err(ValidationError::EmptyField("enrichment.merge_field"));
            }
        }
        Ok(())
    }

    /// Loads and validates a definition from a JSON file.
    ///
    /// An unreadable file is missing configuration; a file that does not
    /// parse as a definition is a validation error.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::MissingConfiguration(format!(
                "cannot read dataset definition {}: {}",
                path.display(),
                e
            ))
        })?;
        let definition: Self =
            serde_json::from_str(&raw).map_err(|e| ValidationError::InvalidDefinition {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        definition.validate()?;
        Ok(definition)
    }
}

fn default_page_size() -> u32 {
    UPSTREAM_PAGE_SIZE
}

fn default_batch_size() -> usize {
    ENRICHMENT_BATCH_SIZE
}

fn default_throttle_ms() -> u64 {
    ENRICHMENT_THROTTLE_MS
}

fn default_merge_field() -> String {
    DEFAULT_MERGE_FIELD.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::ExecutionId;
    use serde_json::json;

    fn scratch_file(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir()
            .join(format!("dataset-definition-{}.json", ExecutionId::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_definition_defaults() {
        let definition: DatasetDefinition = serde_json::from_value(json!({
            "id": "orders",
            "primary": {
                "resource": "order",
                "query": "query($first: Int!, $after: String) { orders(first: $first, after: $after) { edges { node { id } } pageInfo { hasNextPage endCursor } } }"
            },
            "enrichment": {
                "id_path": "lineItems.edges.node.product.id",
                "query_template": "{ nodes(ids: {{ids}}) { id } }"
            }
        }))
        .unwrap();

        assert_eq!(definition.primary.page_size, UPSTREAM_PAGE_SIZE);
        let enrichment = definition.enrichment.as_ref().unwrap();
        assert_eq!(enrichment.batch_size, 50);
        assert_eq!(enrichment.throttle(), Duration::from_millis(500));
        assert_eq!(enrichment.merge_field, "enrichment");
        assert!(definition.validate().is_ok());
    }

    #[test]
    fn test_definition_rejects_bad_template_and_bounds() {
        let bad_template = serde_json::from_value::<DatasetDefinition>(json!({
            "id": "orders",
            "primary": {"resource": "order", "query": "{ orders }"},
            "enrichment": {"id_path": "a.b", "query_template": "{ nodes { id } }"}
        }));
        assert!(bad_template.is_err());

        let mut definition: DatasetDefinition = serde_json::from_value(json!({
            "id": "orders",
            "primary": {"resource": "order", "query": "{ orders }", "page_size": 0}
        }))
        .unwrap();
        assert!(definition.validate().is_err());
        definition.primary.page_size = 50;
        assert!(definition.validate().is_ok());
    }

    #[test]
    fn test_unparseable_definition_file_is_validation_error() {
        let path = scratch_file(r#"{"id": "orders", "primary": {"resource": "order"}"#);
        let err = DatasetDefinition::from_json_file(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_missing_definition_file_is_configuration_error() {
        let path = std::env::temp_dir().join(format!("absent-{}.json", ExecutionId::new_v4()));
        let err = DatasetDefinition::from_json_file(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_definition_file_round_trip() {
        let path = scratch_file(
            r#"{"id": "orders", "primary": {"resource": "order", "query": "{ orders }"}}"#,
        );
        let definition = DatasetDefinition::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(definition.id.as_str(), "orders");
        assert_eq!(definition.primary.page_size, UPSTREAM_PAGE_SIZE);
    }
}
