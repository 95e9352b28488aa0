// src/extraction.rs
//! Identifier extraction from nested, possibly array-valued documents.
//!
//! Walking a path never fails. A document whose shape does not match the
//! path simply contributes nothing; the other documents are unaffected.

use crate::types::FieldPath;
use indexmap::IndexSet;
use serde_json::Value;

/// Deduplicated identifiers collected for one enrichment requirement.
///
/// Iteration follows first-seen order, which is what batching uses as its
/// stable sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedIdSet {
    ids: IndexSet<String>,
}

impl ExtractedIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an id, returning whether it was new.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.ids.iter()
    }

    /// The ids as an ordered sequence, ready to be cut into batches.
    pub fn to_ordered_vec(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }
}

impl FromIterator<String> for ExtractedIdSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ExtractedIdSet {
    type Item = &'a String;
    type IntoIter = indexmap::set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

/// Collects every string reachable from `documents` along `path`.
pub fn extract_ids(documents: &[Value], path: &FieldPath) -> ExtractedIdSet {
    let mut ids = ExtractedIdSet::new();
    let mut abandoned = 0usize;

    for (index, document) in documents.iter().enumerate() {
        match resolve_path(document, path.segments()) {
            Some(leaves) => collect_strings(&leaves, &mut ids),
            None => {
                abandoned += 1;
                log::debug!("Document {} has no value at '{}', skipping", index, path);
            }
        }
    }

    if abandoned > 0 {
        log::debug!(
            "{} of {} documents had no value at '{}'",
            abandoned,
            documents.len(),
            path
        );
    }
    log::debug!("Extracted {} unique ids along '{}'", ids.len(), path);
    ids
}

/// Ids found along `path` within a single document.
pub fn extract_ids_from(document: &Value, path: &FieldPath) -> ExtractedIdSet {
    let mut ids = ExtractedIdSet::new();
    if let Some(leaves) = resolve_path(document, path.segments()) {
        collect_strings(&leaves, &mut ids);
    }
    ids
}

/// Follows `segments` from `document`, fanning out over arrays.
///
/// Returns `None` as soon as no branch can continue.
fn resolve_path<'a>(document: &'a Value, segments: &[String]) -> Option<Vec<&'a Value>> {
    let mut frontier = vec![document];

    for segment in segments {
        let mut next = Vec::with_capacity(frontier.len());
        for value in frontier {
            project(value, segment, &mut next);
        }
        if next.is_empty() {
            return None;
        }
        frontier = next;
    }

    Some(frontier)
}

/// Descends into `segment` of `value`, or of every element if it is an array.
fn project<'a>(value: &'a Value, segment: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(fields) => {
            if let Some(child) = fields.get(segment) {
                if !child.is_null() {
                    out.push(child);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                project(item, segment, out);
            }
        }
        _ => {}
    }
}

fn collect_strings(values: &[&Value], ids: &mut ExtractedIdSet) {
    for value in values {
        match value {
            Value::String(s) => {
                ids.insert(s.as_str());
            }
            Value::Array(items) => {
                let nested: Vec<&Value> = items.iter().collect();
                collect_strings(&nested, ids);
            }
            _ => {}
        }
    }
}
