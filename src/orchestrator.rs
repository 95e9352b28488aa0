// src/orchestrator.rs
//! Drives one extraction end to end and owns its execution record.
//!
//! A run is a single sequential task: paginate the primary query, then
//! (when the dataset asks for it) extract ids and enrich, then write the
//! terminal record. Every failure inside the run becomes a failed record;
//! nothing propagates past [`ExecutionOrchestrator::run`] except a store
//! that refuses the write itself.

use crate::api::{ApiCallLedger, UpstreamClient};
use crate::catalog::DatasetCatalog;
use crate::enrichment::SecondaryQueryBatcher;
use crate::error::AppError;
use crate::extraction::{extract_ids, extract_ids_from};
use crate::model::{
    DatasetDefinition, EnrichmentSpec, ErrorDetail, ExecutionRecord, ExecutionStatus,
    RecordTransition,
};
use crate::store::ExecutionStore;
use crate::types::{DatasetId, ExecutionId, SourceCredentials};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Starts, runs, and retries dataset executions.
///
/// Cloning is cheap; clones share the store, catalog, and client.
#[derive(Clone)]
pub struct ExecutionOrchestrator {
    store: Arc<dyn ExecutionStore>,
    catalog: Arc<dyn DatasetCatalog>,
    client: UpstreamClient,
}

impl ExecutionOrchestrator {
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        catalog: Arc<dyn DatasetCatalog>,
        client: UpstreamClient,
    ) -> Self {
        Self {
            store,
            catalog,
            client,
        }
    }

    pub fn store(&self) -> &Arc<dyn ExecutionStore> {
        &self.store
    }

    /// Starts a run for `dataset_id` in the background and returns its id.
    ///
    /// Fails synchronously, creating no record, when the dataset or its
    /// credentials cannot be resolved.
    pub async fn trigger(&self, dataset_id: &DatasetId) -> Result<ExecutionId, AppError> {
        let definition = self.catalog.definition(dataset_id).await?;
        definition.validate()?;
        let credentials = self.catalog.credentials(&definition).await?;
        credentials.endpoint()?;

        let id = self.start(&definition).await?;
        let orchestrator = self.clone();
        let run_id = id.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.run(&run_id, &definition, &credentials).await {
                log::error!("Execution {} could not record its outcome: {}", run_id, e);
            }
        });

        Ok(id)
    }

    /// Starts a fresh run for the dataset of a failed execution.
    ///
    /// The failed record is left untouched.
    pub async fn retry(&self, execution_id: &ExecutionId) -> Result<ExecutionId, AppError> {
        let previous = self.store.get(execution_id).await?;
        if previous.status != ExecutionStatus::Failed {
            return Err(AppError::NotRetryable {
                id: execution_id.to_string(),
                status: previous.status,
            });
        }
        log::info!(
            "Retrying dataset {} after failed execution {}",
            previous.dataset_id,
            execution_id
        );
        self.trigger(&previous.dataset_id).await
    }

    /// Creates the pending record for a new run.
    pub async fn start(&self, definition: &DatasetDefinition) -> Result<ExecutionId, AppError> {
        let record = ExecutionRecord::pending(definition.id.clone());
        let id = self.store.create(record).await?;
        log::info!("Created execution {} for dataset {}", id, definition.id);
        Ok(id)
    }

    /// Runs a started execution to its terminal state.
    ///
    /// Returns the terminal record. `Err` only when the record cannot be
    /// marked running, e.g. because another writer already moved it on.
    /// A failed terminal write is logged and the terminal record returned
    /// as it would have been stored.
    pub async fn run(
        &self,
        id: &ExecutionId,
        definition: &DatasetDefinition,
        credentials: &SourceCredentials,
    ) -> Result<ExecutionRecord, AppError> {
        let running = self.store.update(id, RecordTransition::Running).await?;
        log::info!("Execution {} running", id);

        let mut ledger = ApiCallLedger::new();
        let outcome = self.extract(definition, credentials, &mut ledger).await;
        let end_time = Utc::now();
        let metadata = ledger.to_metadata();

        let transition = match outcome {
            Ok(data) => {
                log::info!(
                    "Execution {} completed: {} rows, {} upstream calls",
                    id,
                    data.len(),
                    ledger.total_calls()
                );
                RecordTransition::Completed {
                    data,
                    end_time,
                    metadata,
                }
            }
            Err(e) => {
                log::error!("Execution {} failed: {}", id, e);
                RecordTransition::Failed {
                    error: ErrorDetail::from_error(&e),
                    end_time,
                    metadata,
                }
            }
        };

        match self.store.update(id, transition.clone()).await {
            Ok(record) => Ok(record),
            Err(e) => {
                log::error!("Execution {}: terminal state not stored: {}", id, e);
                let mut record = running;
                record.apply(transition)?;
                Ok(record)
            }
        }
    }

    /// Fetches every primary page, then enriches if the dataset asks for it.
    async fn extract(
        &self,
        definition: &DatasetDefinition,
        credentials: &SourceCredentials,
        ledger: &mut ApiCallLedger,
    ) -> Result<Vec<Value>, AppError> {
        let endpoint = credentials.endpoint()?;

        let primary = self
            .client
            .fetch_all(&endpoint, credentials, &definition.primary, ledger)
            .await?;
        log::info!(
            "Fetched {} primary records over {} pages for {}",
            primary.items.len(),
            primary.pages_fetched,
            definition.id
        );

        let Some(enrichment) = &definition.enrichment else {
            return Ok(primary.items);
        };

        let ids = extract_ids(&primary.items, &enrichment.id_path);
        let batcher =
            SecondaryQueryBatcher::new(&self.client, enrichment.batch_size, enrichment.throttle());
        let secondary = batcher
            .enrich(
                &ids,
                &enrichment.query_template,
                &endpoint,
                credentials,
                ledger,
            )
            .await?;

        Ok(merge_secondary(primary.items, &secondary, enrichment))
    }
}

/// Attaches to each primary record the secondary nodes whose `id` appears
/// at the record's id path, under `merge_field`.
///
/// Records whose ids matched nothing get an empty list, so every row has
/// the same shape.
pub fn merge_secondary(
    primary: Vec<Value>,
    secondary: &[Value],
    spec: &EnrichmentSpec,
) -> Vec<Value> {
    let by_id: HashMap<&str, &Value> = secondary
        .iter()
        .filter_map(|node| node.get("id").and_then(Value::as_str).map(|id| (id, node)))
        .collect();

    primary
        .into_iter()
        .map(|mut record| {
            let matched: Vec<Value> = extract_ids_from(&record, &spec.id_path)
                .iter()
                .filter_map(|id| by_id.get(id.as_str()).map(|node| (*node).clone()))
                .collect();
            if let Value::Object(fields) = &mut record {
                fields.insert(spec.merge_field.clone(), Value::Array(matched));
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldPath, QueryTemplate};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_merge_attaches_matching_nodes() {
        let spec = EnrichmentSpec::new(
            FieldPath::parse("items.productId").unwrap(),
            QueryTemplate::parse("{ nodes(ids: {{ids}}) { id } }").unwrap(),
        );
        let primary = vec![
            json!({"id": "o1", "items": [{"productId": "p1"}, {"productId": "p2"}]}),
            json!({"id": "o2", "items": [{"productId": "p9"}]}),
            json!("not an object"),
        ];
        let secondary = vec![
            json!({"id": "p1", "title": "Hat"}),
            json!({"id": "p2", "title": "Scarf"}),
        ];

        let merged = merge_secondary(primary, &secondary, &spec);
        assert_eq!(merged.len(), 3);
        assert_eq!(
            merged[0]["enrichment"],
            json!([{"id": "p1", "title": "Hat"}, {"id": "p2", "title": "Scarf"}])
        );
        assert_eq!(merged[1]["enrichment"], json!([]));
        assert_eq!(merged[2], json!("not an object"));
    }
}
