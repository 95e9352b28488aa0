// src/api/resolver.rs
//! Locating the paginated payload inside a response's `data` object.
//!
//! Resolution is an ordered strategy: the known field for the resource,
//! then a pluralized guess, then a scan for any field shaped like a
//! connection. When nothing matches the result is a `SchemaMismatch`,
//! never an empty page.

use super::parser::json_type_name;
use super::types::UpstreamPage;
use crate::error::AppError;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Logical resource names whose payload field does not follow the simple
/// plural rule.
static KNOWN_PAYLOAD_FIELDS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("product", "products"),
        ("order", "orders"),
        ("customer", "customers"),
        ("collection", "collections"),
        ("location", "locations"),
        ("product_variant", "productVariants"),
        ("productvariant", "productVariants"),
        ("variant", "productVariants"),
        ("inventory_item", "inventoryItems"),
        ("inventoryitem", "inventoryItems"),
        ("draft_order", "draftOrders"),
        ("draftorder", "draftOrders"),
        ("fulfillment_order", "fulfillmentOrders"),
        ("fulfillmentorder", "fulfillmentOrders"),
        ("discount", "discountNodes"),
        ("metaobject", "metaobjects"),
        ("file", "files"),
    ])
});

/// How the payload field was found; logged to make guesses visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    KnownField,
    PluralGuess,
    StructuralScan,
}

/// Resolves the payload of `data` for `resource` into a page.
pub fn resolve_page(data: &Value, resource: &str) -> Result<UpstreamPage, AppError> {
    let fields = match data {
        Value::Object(fields) => fields,
        other => {
            return Err(AppError::SchemaMismatch {
                resource: resource.to_string(),
                fields: vec![format!("data is {}", json_type_name(other))],
            })
        }
    };

    let (field, resolution) = locate_payload_field(fields, resource).ok_or_else(|| {
        log::warn!(
            "No connection-shaped payload for '{}' among {:?}",
            resource,
            fields.keys().collect::<Vec<_>>()
        );
        AppError::SchemaMismatch {
            resource: resource.to_string(),
            fields: fields.keys().cloned().collect(),
        }
    })?;
    log::debug!("Payload for '{}' found at '{}' via {:?}", resource, field, resolution);

    let connection = &fields[field.as_str()];
    read_connection(field, connection, resource)
}

/// Finds the top-level field holding the connection for `resource`.
pub fn locate_payload_field(
    fields: &Map<String, Value>,
    resource: &str,
) -> Option<(String, Resolution)> {
    let normalized = resource.trim().to_ascii_lowercase();

    if let Some(known) = KNOWN_PAYLOAD_FIELDS.get(normalized.as_str()) {
        if fields.get(*known).is_some_and(is_connection) {
            return Some((known.to_string(), Resolution::KnownField));
        }
    }

    let guess = pluralize(&normalized);
    if fields.get(&guess).is_some_and(is_connection) {
        return Some((guess, Resolution::PluralGuess));
    }

    fields
        .iter()
        .find(|(_, value)| is_connection(value))
        .map(|(name, _)| (name.clone(), Resolution::StructuralScan))
}

/// A connection exposes a list of edges or nodes alongside a `pageInfo` object.
pub fn is_connection(value: &Value) -> bool {
    let has_items = value.get("edges").is_some_and(Value::is_array)
        || value.get("nodes").is_some_and(Value::is_array);
    let has_page_info = value.get("pageInfo").is_some_and(Value::is_object);
    has_items && has_page_info
}

fn read_connection(
    field: String,
    connection: &Value,
    resource: &str,
) -> Result<UpstreamPage, AppError> {
    let nodes = match connection.get("edges").and_then(Value::as_array) {
        Some(edges) => edges
            .iter()
            .filter_map(|edge| edge.get("node"))
            .filter(|node| !node.is_null())
            .cloned()
            .collect(),
        None => connection
            .get("nodes")
            .and_then(Value::as_array)
            .map(|nodes| nodes.iter().filter(|n| !n.is_null()).cloned().collect())
            .unwrap_or_default(),
    };

    let page_info = &connection["pageInfo"];
    let has_next_page = match page_info.get("hasNextPage") {
        Some(Value::Bool(flag)) => *flag,
        other => {
            return Err(AppError::SchemaMismatch {
                resource: resource.to_string(),
                fields: vec![format!(
                    "{}.pageInfo.hasNextPage is {}",
                    field,
                    other.map_or("missing", json_type_name)
                )],
            })
        }
    };
    let next_cursor = page_info
        .get("endCursor")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(UpstreamPage {
        field,
        nodes,
        has_next_page,
        next_cursor,
    })
}

/// Naive English plural of a lowercase resource name.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{}ies", stem);
        }
    }
    if word.ends_with('s') || word.ends_with('x') || word.ends_with("ch") || word.ends_with("sh") {
        return format!("{}es", word);
    }
    format!("{}s", word)
}
