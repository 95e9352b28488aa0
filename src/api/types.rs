//! Type definitions for the upstream API module.
//!
//! Requests, response envelopes, resolved pages, and the call ledger a run
//! threads through every upstream interaction.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- Request Types ---

/// Body of a GraphQL POST.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

impl GraphQlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }
}

/// Why an upstream call was made, for accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPurpose {
    /// A page of the primary paginated query
    PrimaryPage,
    /// One batch of a secondary enrichment query
    EnrichmentBatch,
}

// --- Response Types ---

/// The raw `{data, errors, extensions}` envelope of a GraphQL response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphQlEnvelope {
    #[serde(default)]
    pub data: Option<Value>,
    /// Usually an array of `{message, ...}`; some servers send a bare string.
    #[serde(default)]
    pub errors: Option<Value>,
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl GraphQlEnvelope {
    /// The first reported error message, if the envelope reports any.
    pub fn first_error(&self) -> Option<String> {
        match self.errors.as_ref()? {
            Value::Array(errors) => errors.first().map(|first| {
                first
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| first.to_string())
            }),
            Value::String(message) if !message.is_empty() => Some(message.clone()),
            Value::Object(fields) if !fields.is_empty() => Some(Value::Object(fields.clone()).to_string()),
            _ => None,
        }
    }
}

/// One page of primary results with its continuation state.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamPage {
    /// The top-level field the payload was found under.
    pub field: String,
    pub nodes: Vec<Value>,
    pub has_next_page: bool,
    pub next_cursor: Option<String>,
}

/// Result of walking every page of a primary query.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationResult {
    pub items: Vec<Value>,
    pub pages_fetched: u32,
}

// --- Accounting ---

/// Running count of upstream calls made during one execution.
///
/// Owned by the orchestrator for the length of a run and passed by `&mut`
/// into every component that talks to the upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiCallLedger {
    pub primary_calls: u32,
    pub enrichment_calls: u32,
    /// Sum of `extensions.cost.actualQueryCost` where reported.
    pub total_query_cost: f64,
    /// Lowest `throttleStatus.currentlyAvailable` observed, where reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_available_cost: Option<f64>,
}

impl ApiCallLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_calls(&self) -> u32 {
        self.primary_calls + self.enrichment_calls
    }

    pub fn record_call(&mut self, purpose: CallPurpose) {
        match purpose {
            CallPurpose::PrimaryPage => self.primary_calls += 1,
            CallPurpose::EnrichmentBatch => self.enrichment_calls += 1,
        }
    }

    /// Folds in the cost figures from a response's `extensions`, if present.
    pub fn record_cost(&mut self, extensions: Option<&Value>) {
        let Some(cost) = extensions.and_then(|e| e.get("cost")) else {
            return;
        };

        if let Some(actual) = cost.get("actualQueryCost").and_then(Value::as_f64) {
            self.total_query_cost += actual;
        }

        if let Some(available) = cost
            .get("throttleStatus")
            .and_then(|t| t.get("currentlyAvailable"))
            .and_then(Value::as_f64)
        {
            self.min_available_cost = Some(match self.min_available_cost {
                Some(current) => current.min(available),
                None => available,
            });
        }
    }

    /// The ledger as an entry for an execution record's metadata.
    pub fn to_metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        let mut ledger = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(fields) = &mut ledger {
            fields.insert("total_calls".to_string(), Value::from(self.total_calls()));
        }
        metadata.insert("api_calls".to_string(), ledger);
        metadata
    }
}
