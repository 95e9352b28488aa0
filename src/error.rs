// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the system.
//! Each variant says what went wrong and where; [`ErrorKind`] is the stable,
//! machine-readable classification that survives into a failed
//! execution record.

use crate::model::ExecutionStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure classification as a typed vocabulary.
///
/// Stored in [`ErrorDetail`](crate::model::ErrorDetail) so consumers can
/// branch on the kind of failure without parsing message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Upstream unreachable or the connection failed mid-request
    Transport,
    /// Upstream answered with a GraphQL `errors` envelope
    Query,
    /// Response did not have the payload shape we expected
    SchemaMismatch,
    /// Upstream answered with a non-success HTTP status
    Upstream,
    /// Pagination hit the configured page limit with pages remaining
    PageLimit,
    /// Execution record could not be read or written
    Storage,
    /// No execution or dataset matches the given id
    NotFound,
    /// Required configuration (credentials, definitions) is missing
    Configuration,
    /// Input failed validation
    Validation,
    /// Anything else
    Internal,
}

impl ErrorKind {
    /// Whether repeating the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport | Self::Upstream | Self::Storage)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Query => write!(f, "query"),
            Self::SchemaMismatch => write!(f, "schema_mismatch"),
            Self::Upstream => write!(f, "upstream"),
            Self::PageLimit => write!(f, "page_limit"),
            Self::Storage => write!(f, "storage"),
            Self::NotFound => write!(f, "not_found"),
            Self::Configuration => write!(f, "configuration"),
            Self::Validation => write!(f, "validation"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upstream query error: {message}")]
    Query { message: String },

    #[error("Upstream payload for '{resource}' not recognized; top-level fields: [{}]", fields.join(", "))]
    SchemaMismatch {
        resource: String,
        fields: Vec<String>,
    },

    #[error("Upstream returned HTTP {status}: {body_preview}")]
    Upstream {
        status: reqwest::StatusCode,
        body_preview: String,
    },

    #[error("Stopped after {max_pages} pages of '{resource}' with more pages remaining")]
    PageLimitExceeded { resource: String, max_pages: u32 },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("No {entity} found with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Execution {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: ExecutionStatus,
        to: ExecutionStatus,
    },

    #[error("Execution {id} is {status}; only failed executions can be retried")]
    NotRetryable { id: String, status: ExecutionStatus },

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Validation(#[from] crate::types::ValidationError),

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AppError {
    /// Builds a storage error that keeps its underlying cause.
    pub fn storage(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The stable classification of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::MissingConfiguration(_) => ErrorKind::Configuration,
            AppError::Transport(_) => ErrorKind::Transport,
            AppError::Query { .. } => ErrorKind::Query,
            AppError::SchemaMismatch { .. } | AppError::MalformedResponse(_) => {
                ErrorKind::SchemaMismatch
            }
            AppError::Upstream { .. } => ErrorKind::Upstream,
            AppError::PageLimitExceeded { .. } => ErrorKind::PageLimit,
            AppError::Storage { .. } | AppError::InvalidTransition { .. } | AppError::Io(_) => {
                ErrorKind::Storage
            }
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::Validation(_) | AppError::NotRetryable { .. } => ErrorKind::Validation,
            AppError::InternalError { .. } => ErrorKind::Internal,
        }
    }

    /// HTTP status reported by the upstream, when there was one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AppError::Upstream { status, .. } => Some(status.as_u16()),
            AppError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether this error means the requested entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError {
            message: format!("Background task failed: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

/// Cuts `body` to at most `limit` characters, marking the cut.
pub fn truncate_body(body: &str, limit: usize) -> String {
    match body.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;
