// src/api/pagination.rs
//! The upstream client: single GraphQL calls and cursor pagination.

use super::client::ApiResponse;
use super::types::{ApiCallLedger, CallPurpose, GraphQlRequest, PaginationResult, UpstreamPage};
use super::{parser, resolver, GraphQlTransport};
use crate::error::AppError;
use crate::model::PrimaryQuery;
use crate::types::SourceCredentials;
use serde_json::{json, Value};
use std::sync::Arc;
use url::Url;

/// Issues upstream calls through a [`GraphQlTransport`] and interprets the
/// responses.
#[derive(Clone)]
pub struct UpstreamClient {
    transport: Arc<dyn GraphQlTransport>,
    max_pages: u32,
}

impl UpstreamClient {
    pub fn new(transport: Arc<dyn GraphQlTransport>, max_pages: u32) -> Self {
        Self {
            transport,
            max_pages: max_pages.max(1),
        }
    }

    /// Sends one request, records it in the ledger, and returns `data`.
    ///
    /// The call is counted even when it fails; the upstream still saw it.
    pub async fn execute(
        &self,
        endpoint: &Url,
        credentials: &SourceCredentials,
        request: &GraphQlRequest,
        purpose: CallPurpose,
        resource: &str,
        ledger: &mut ApiCallLedger,
    ) -> Result<Value, AppError> {
        let response: ApiResponse<String> =
            self.transport.execute(endpoint, credentials, request).await?;
        ledger.record_call(purpose);

        let envelope = parser::parse_envelope(&response)?;
        ledger.record_cost(envelope.extensions.as_ref());
        parser::into_data(envelope, resource)
    }

    /// Fetches one page of `query`, continuing from `cursor` when given.
    pub async fn fetch_page(
        &self,
        endpoint: &Url,
        credentials: &SourceCredentials,
        query: &PrimaryQuery,
        cursor: Option<&str>,
        ledger: &mut ApiCallLedger,
    ) -> Result<UpstreamPage, AppError> {
        let request = GraphQlRequest::new(query.query.as_str()).with_variables(json!({
            "first": query.page_size,
            "after": cursor,
        }));

        let data = self
            .execute(
                endpoint,
                credentials,
                &request,
                CallPurpose::PrimaryPage,
                &query.resource,
                ledger,
            )
            .await?;
        resolver::resolve_page(&data, &query.resource)
    }

    /// Follows cursors until the upstream reports no further pages.
    ///
    /// A partial result is never returned. Needing a page past `max_pages`
    /// is [`AppError::PageLimitExceeded`]; `hasNextPage` without an
    /// `endCursor` is a `SchemaMismatch`.
    pub async fn fetch_all(
        &self,
        endpoint: &Url,
        credentials: &SourceCredentials,
        query: &PrimaryQuery,
        ledger: &mut ApiCallLedger,
    ) -> Result<PaginationResult, AppError> {
        let mut all_items = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages_fetched = 0u32;

        loop {
            let page = self
                .fetch_page(endpoint, credentials, query, cursor.as_deref(), ledger)
                .await?;
            pages_fetched += 1;
            log::debug!(
                "Page {} of '{}': {} records (has next: {})",
                pages_fetched,
                page.field,
                page.nodes.len(),
                page.has_next_page
            );

            all_items.extend(page.nodes);
            if !page.has_next_page {
                break;
            }

            let Some(next) = page.next_cursor else {
                log::warn!("'{}' reported another page but no cursor", page.field);
                return Err(AppError::SchemaMismatch {
                    resource: query.resource.clone(),
                    fields: vec![format!(
                        "{}.pageInfo.endCursor missing while hasNextPage is true",
                        page.field
                    )],
                });
            };
            if pages_fetched >= self.max_pages {
                log::warn!(
                    "Reached maximum page limit ({}) for '{}' with pages remaining",
                    self.max_pages,
                    query.resource
                );
                return Err(AppError::PageLimitExceeded {
                    resource: query.resource.clone(),
                    max_pages: self.max_pages,
                });
            }
            cursor = Some(next);
        }

        Ok(PaginationResult {
            items: all_items,
            pages_fetched,
        })
    }
}
