// src/api/parser.rs
//! Parsing of raw upstream responses into GraphQL envelopes.
//!
//! Every failure here is explicit: a non-success status, a body that is not
//! JSON, an `errors` envelope, and a missing `data` object each map to
//! their own error so an empty page is never confused with a broken one.

use super::client::ApiResponse;
use super::types::GraphQlEnvelope;
use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::{truncate_body, AppError};
use serde_json::Value;

/// Parses a raw response into its envelope, rejecting non-success statuses.
pub fn parse_envelope(result: &ApiResponse<String>) -> Result<GraphQlEnvelope, AppError> {
    if !result.status.is_success() {
        log::warn!("Upstream {} answered HTTP {}", result.url, result.status);
        return Err(AppError::Upstream {
            status: result.status,
            body_preview: truncate_body(&result.data, ERROR_BODY_PREVIEW_LENGTH),
        });
    }

    serde_json::from_str(&result.data).map_err(|e| {
        log::error!("Failed to parse response from {}: {}", result.url, e);
        AppError::MalformedResponse(format!(
            "{} (body: {})",
            e,
            truncate_body(&result.data, ERROR_BODY_PREVIEW_LENGTH)
        ))
    })
}

/// Returns the `data` object of an envelope that reports no errors.
///
/// A response carrying both `data` and `errors` is rejected as a whole.
pub fn into_data(envelope: GraphQlEnvelope, resource: &str) -> Result<Value, AppError> {
    if let Some(message) = envelope.first_error() {
        return Err(AppError::Query { message });
    }

    match envelope.data {
        Some(data @ Value::Object(_)) => Ok(data),
        Some(other) => Err(AppError::SchemaMismatch {
            resource: resource.to_string(),
            fields: vec![format!("data is {}", json_type_name(&other))],
        }),
        None => Err(AppError::SchemaMismatch {
            resource: resource.to_string(),
            fields: Vec::new(),
        }),
    }
}

/// Short JSON type name for diagnostics.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
