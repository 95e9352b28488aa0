//! Upstream API interaction: the ability to query a tenant's GraphQL API.
//!
//! This module keeps I/O, parsing, and payload resolution apart: the
//! transport moves bytes, the parser turns them into envelopes, the
//! resolver finds the paginated payload, and [`UpstreamClient`] drives them.

pub mod client;
pub mod pagination;
pub mod parser;
pub mod resolver;
pub mod types;

use crate::error::AppError;
use crate::types::SourceCredentials;
use url::Url;

/// The ability to deliver one GraphQL request to the upstream API.
///
/// Business logic depends on this trait, never on HTTP details.
/// Implementations return the raw response, whatever its status; status
/// interpretation belongs to the parser.
#[async_trait::async_trait]
pub trait GraphQlTransport: Send + Sync {
    async fn execute(
        &self,
        endpoint: &Url,
        credentials: &SourceCredentials,
        request: &types::GraphQlRequest,
    ) -> Result<client::ApiResponse<String>, AppError>;
}

pub use client::{ApiResponse, UpstreamHttpClient};
pub use pagination::UpstreamClient;
pub use types::{ApiCallLedger, CallPurpose, GraphQlRequest, PaginationResult, UpstreamPage};
