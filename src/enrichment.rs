// src/enrichment.rs
//! Batched secondary lookups keyed by extracted ids.
//!
//! Batches run one at a time with a fixed pause between them. Any failing
//! batch fails the whole enrichment; a partial join is never returned.

use crate::api::{ApiCallLedger, CallPurpose, GraphQlRequest, UpstreamClient};
use crate::error::AppError;
use crate::extraction::ExtractedIdSet;
use crate::types::{QueryTemplate, SourceCredentials};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// One enrichment call: a slice of ids rendered into the query template.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest<'a> {
    pub index: usize,
    pub ids: &'a [String],
    pub query: String,
}

/// Cuts `ids` into consecutive batches of at most `batch_size`.
pub fn plan_batches<'a>(
    ids: &'a [String],
    template: &QueryTemplate,
    batch_size: usize,
) -> Vec<BatchRequest<'a>> {
    ids.chunks(batch_size.max(1))
        .enumerate()
        .map(|(index, chunk)| BatchRequest {
            index,
            ids: chunk,
            query: template.render(chunk),
        })
        .collect()
}

/// Runs an enrichment query over an id set, one batch at a time.
pub struct SecondaryQueryBatcher<'a> {
    client: &'a UpstreamClient,
    batch_size: usize,
    throttle: Duration,
}

impl<'a> SecondaryQueryBatcher<'a> {
    pub fn new(client: &'a UpstreamClient, batch_size: usize, throttle: Duration) -> Self {
        Self {
            client,
            batch_size: batch_size.max(1),
            throttle,
        }
    }

    /// Looks up every id and returns the concatenated node lists.
    pub async fn enrich(
        &self,
        ids: &ExtractedIdSet,
        template: &QueryTemplate,
        endpoint: &Url,
        credentials: &SourceCredentials,
        ledger: &mut ApiCallLedger,
    ) -> Result<Vec<Value>, AppError> {
        if ids.is_empty() {
            log::debug!("No ids to enrich; skipping secondary lookups");
            return Ok(Vec::new());
        }

        let ordered = ids.to_ordered_vec();
        let batches = plan_batches(&ordered, template, self.batch_size);
        let total = batches.len();
        log::info!(
            "Enriching {} ids in {} batch(es) of up to {}",
            ordered.len(),
            total,
            self.batch_size
        );

        let mut nodes = Vec::with_capacity(ordered.len());
        for batch in batches {
            let request = GraphQlRequest::new(batch.query);
            let data = self
                .client
                .execute(
                    endpoint,
                    credentials,
                    &request,
                    CallPurpose::EnrichmentBatch,
                    "nodes",
                    ledger,
                )
                .await
                .map_err(|e| {
                    log::warn!("Enrichment batch {}/{} failed: {}", batch.index + 1, total, e);
                    e
                })?;

            let batch_nodes = read_nodes(data)?;
            log::debug!(
                "Batch {}/{}: {} ids → {} nodes",
                batch.index + 1,
                total,
                batch.ids.len(),
                batch_nodes.len()
            );
            nodes.extend(batch_nodes);

            if batch.index + 1 < total && !self.throttle.is_zero() {
                tokio::time::sleep(self.throttle).await;
            }
        }

        Ok(nodes)
    }
}

/// The non-null entries of `data.nodes`.
fn read_nodes(data: Value) -> Result<Vec<Value>, AppError> {
    match data {
        Value::Object(mut fields) => match fields.remove("nodes") {
            Some(Value::Array(nodes)) => Ok(nodes.into_iter().filter(|n| !n.is_null()).collect()),
            _ => Err(AppError::SchemaMismatch {
                resource: "nodes".to_string(),
                fields: fields.keys().cloned().collect(),
            }),
        },
        _ => Err(AppError::SchemaMismatch {
            resource: "nodes".to_string(),
            fields: Vec::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_batches_sizes() {
        let ids: Vec<String> = (0..120).map(|i| format!("gid://p/{}", i)).collect();
        let template = QueryTemplate::parse("{ nodes(ids: {{ids}}) { id } }").unwrap();
        let batches = plan_batches(&ids, &template, 50);

        assert_eq!(batches.len(), 3);
        assert_eq!(
            batches.iter().map(|b| b.ids.len()).collect::<Vec<_>>(),
            vec![50, 50, 20]
        );
        assert_eq!(batches[2].index, 2);
        assert!(batches[2].query.contains("\"gid://p/100\""));
        assert!(!batches[2].query.contains("\"gid://p/99\""));
    }

    #[test]
    fn test_read_nodes_drops_nulls() {
        let nodes = read_nodes(json!({"nodes": [{"id": "a"}, null, {"id": "b"}]})).unwrap();
        assert_eq!(nodes, vec![json!({"id": "a"}), json!({"id": "b"})]);
        assert!(matches!(
            read_nodes(json!({"node": {}})),
            Err(AppError::SchemaMismatch { .. })
        ));
    }
}
