// src/lib.rs
//! dataset-extractor library: pulls paginated GraphQL datasets into
//! execution records that consumers poll.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ErrorKind`, `ValidationError`
//! - **Configuration**: `RunConfig`, `ExtractionSettings`, `PollSettings`
//! - **Domain model**: `DatasetDefinition`, `ExecutionRecord`, `RecordTransition`
//! - **Domain types**: `ExecutionId`, `DatasetId`, `FieldPath`, `QueryTemplate`, credentials
//! - **Upstream**: `UpstreamClient`, `UpstreamHttpClient`, `GraphQlTransport`
//! - **Execution**: `ExecutionOrchestrator`, `ExecutionStore`, `ExecutionPoller`

pub mod api;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod enrichment;
pub mod error;
pub mod extraction;
pub mod model;
pub mod orchestrator;
pub mod polling;
pub mod store;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, ErrorKind};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{Command, CommandLineInput, ExtractionSettings, RunConfig};
pub use crate::polling::PollSettings;

// --- Domain Model ---
pub use crate::model::{
    DatasetDefinition, EnrichmentSpec, ErrorDetail, ExecutionRecord, ExecutionStatus,
    ExecutionSummary, PrimaryQuery, RecordTransition,
};

// --- Domain Types ---
pub use crate::types::{
    AccessToken, ApiVersion, AuthScheme, DatasetId, ExecutionId, FieldPath, QueryTemplate,
    SourceCredentials, StoreDomain,
};

// --- Upstream ---
pub use crate::api::{
    ApiCallLedger, ApiResponse, GraphQlRequest, GraphQlTransport, UpstreamClient,
    UpstreamHttpClient,
};
pub use crate::enrichment::SecondaryQueryBatcher;
pub use crate::extraction::{extract_ids, ExtractedIdSet};

// --- Execution ---
pub use crate::catalog::{DatasetCatalog, StaticCatalog};
pub use crate::orchestrator::{merge_secondary, ExecutionOrchestrator};
pub use crate::polling::{ExecutionPoller, PollState};
pub use crate::store::{ExecutionStore, FileExecutionStore, InMemoryExecutionStore};
