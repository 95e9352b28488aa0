// tests/common/mod.rs
//! Shared fixtures: a scripted upstream and dataset builders.
#![allow(dead_code)]

use dataset_extractor::{
    AccessToken, ApiResponse, AppError, DatasetDefinition, DatasetId, EnrichmentSpec, FieldPath,
    GraphQlRequest, GraphQlTransport, PrimaryQuery, QueryTemplate, SourceCredentials, StoreDomain,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use url::Url;

/// Replays canned responses in order and remembers every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<ApiResponse<String>>>,
    requests: Mutex<Vec<GraphQlRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = ApiResponse<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GraphQlRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait::async_trait]
impl GraphQlTransport for ScriptedTransport {
    async fn execute(
        &self,
        endpoint: &Url,
        _credentials: &SourceCredentials,
        request: &GraphQlRequest,
    ) -> Result<ApiResponse<String>, AppError> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .map(|mut response| {
                response.url = endpoint.to_string();
                response
            })
            .ok_or_else(|| AppError::InternalError {
                message: "scripted transport ran out of responses".to_string(),
                source: None,
            })
    }
}

pub fn ok(body: Value) -> ApiResponse<String> {
    ApiResponse {
        data: body.to_string(),
        status: reqwest::StatusCode::OK,
        url: String::new(),
    }
}

pub fn http_error(status: u16, body: &str) -> ApiResponse<String> {
    ApiResponse {
        data: body.to_string(),
        status: reqwest::StatusCode::from_u16(status).unwrap(),
        url: String::new(),
    }
}

/// One `orders` page with `count` nodes numbered from `start`, each
/// referencing one product.
pub fn orders_page(start: usize, count: usize, next_cursor: Option<&str>) -> ApiResponse<String> {
    let edges: Vec<Value> = (start..start + count)
        .map(|n| {
            json!({
                "node": {
                    "id": format!("gid://shop/Order/{}", n),
                    "lineItems": [{"productId": format!("gid://shop/Product/{}", n)}]
                }
            })
        })
        .collect();
    ok(json!({
        "data": {
            "orders": {
                "edges": edges,
                "pageInfo": {
                    "hasNextPage": next_cursor.is_some(),
                    "endCursor": next_cursor
                }
            }
        },
        "extensions": {
            "cost": {
                "actualQueryCost": 12.0,
                "throttleStatus": {"currentlyAvailable": 988.0}
            }
        }
    }))
}

/// A `nodes` lookup answering every id in `ids` with a product.
pub fn nodes_response(ids: &[String]) -> ApiResponse<String> {
    let nodes: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "title": format!("Product {}", id)}))
        .collect();
    ok(json!({"data": {"nodes": nodes}}))
}

pub fn graphql_error(message: &str) -> ApiResponse<String> {
    ok(json!({"errors": [{"message": message}]}))
}

pub fn credentials() -> SourceCredentials {
    SourceCredentials::new(
        StoreDomain::new("acme.myshopify.com").unwrap(),
        AccessToken::new("shpat_test_token").unwrap(),
    )
}

pub fn orders_definition() -> DatasetDefinition {
    DatasetDefinition {
        id: DatasetId::parse("orders").unwrap(),
        name: Some("Orders".to_string()),
        primary: PrimaryQuery {
            resource: "order".to_string(),
            query: "query($first: Int!, $after: String) { orders(first: $first, after: $after) { edges { node { id } } pageInfo { hasNextPage endCursor } } }".to_string(),
            page_size: 10,
        },
        enrichment: None,
    }
}

pub fn enriched_definition(batch_size: usize, throttle_ms: u64) -> DatasetDefinition {
    let mut spec = EnrichmentSpec::new(
        FieldPath::parse("lineItems.productId").unwrap(),
        QueryTemplate::parse("{ nodes(ids: {{ids}}) { ... on Product { id title } } }").unwrap(),
    );
    spec.batch_size = batch_size;
    spec.throttle_ms = throttle_ms;
    DatasetDefinition {
        enrichment: Some(spec),
        ..orders_definition()
    }
}

/// Product ids `gid://shop/Product/{start..start+count}`.
pub fn product_ids(start: usize, count: usize) -> Vec<String> {
    (start..start + count)
        .map(|n| format!("gid://shop/Product/{}", n))
        .collect()
}
