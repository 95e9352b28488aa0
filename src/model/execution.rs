//! The execution record: one run of a dataset extraction, as seen by
//! both the orchestrator (writer) and polling consumers (readers).

use crate::error::{AppError, ErrorKind};
use crate::types::{DatasetId, ExecutionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Lifecycle of an execution. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a record in this status may move to `next`.
    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Structured description of why an execution failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
    /// HTTP status reported by the upstream, if the failure carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorDetail {
    pub fn from_error(error: &AppError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            status: error.upstream_status(),
        }
    }

    /// Human text for the record's `error_message`, prefixed with the kind.
    pub fn summary(&self) -> String {
        format!("[{}] {}", self.kind, self.message)
    }
}

/// A state change applied to an execution record.
///
/// Each variant carries every field its target status requires, so a
/// record can never hold data without a row count, or an error message
/// without having failed.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordTransition {
    Running,
    Completed {
        data: Vec<Value>,
        end_time: DateTime<Utc>,
        metadata: Map<String, Value>,
    },
    Failed {
        error: ErrorDetail,
        end_time: DateTime<Utc>,
        metadata: Map<String, Value>,
    },
}

impl RecordTransition {
    pub fn target(&self) -> ExecutionStatus {
        match self {
            Self::Running => ExecutionStatus::Running,
            Self::Completed { .. } => ExecutionStatus::Completed,
            Self::Failed { .. } => ExecutionStatus::Failed,
        }
    }
}

/// One run of a dataset's extraction job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub dataset_id: DatasetId,
    pub status: ExecutionStatus,
    pub data: Option<Vec<Value>>,
    pub row_count: Option<u64>,
    pub execution_time_ms: Option<u64>,
    pub error_message: Option<String>,
    pub error_detail: Option<ErrorDetail>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ExecutionRecord {
    /// A freshly created record, stamped with the current time.
    pub fn pending(dataset_id: DatasetId) -> Self {
        Self::pending_at(dataset_id, Utc::now())
    }

    pub fn pending_at(dataset_id: DatasetId, start_time: DateTime<Utc>) -> Self {
        Self {
            id: ExecutionId::new_v4(),
            dataset_id,
            status: ExecutionStatus::Pending,
            data: None,
            row_count: None,
            execution_time_ms: None,
            error_message: None,
            error_detail: None,
            start_time,
            end_time: None,
            metadata: Map::new(),
        }
    }

    /// Applies a transition, refusing anything but a forward move.
    pub fn apply(&mut self, transition: RecordTransition) -> Result<(), AppError> {
        let target = transition.target();
        if !self.status.can_transition_to(target) {
            return Err(AppError::InvalidTransition {
                id: self.id.to_string(),
                from: self.status,
                to: target,
            });
        }

        match transition {
            RecordTransition::Running => {}
            RecordTransition::Completed {
                data,
                end_time,
                metadata,
            } => {
                self.row_count = Some(data.len() as u64);
                self.data = Some(data);
                self.finish(end_time, metadata);
            }
            RecordTransition::Failed {
                error,
                end_time,
                metadata,
            } => {
                self.error_message = Some(error.summary());
                self.error_detail = Some(error);
                self.finish(end_time, metadata);
            }
        }
        self.status = target;
        Ok(())
    }

    fn finish(&mut self, end_time: DateTime<Utc>, metadata: Map<String, Value>) {
        let elapsed = (end_time - self.start_time).num_milliseconds().max(0);
        self.execution_time_ms = Some(elapsed as u64);
        self.end_time = Some(end_time);
        self.metadata.extend(metadata);
    }

    /// The message a consumer should show for a failed run.
    ///
    /// Prefers the structured detail over the raw text field.
    pub fn failure_message(&self) -> Option<&str> {
        self.error_detail
            .as_ref()
            .map(|detail| detail.message.as_str())
            .or(self.error_message.as_deref())
    }

    /// Status view without the (possibly large) data payload.
    pub fn summary(&self) -> ExecutionSummary {
        ExecutionSummary {
            id: self.id.clone(),
            dataset_id: self.dataset_id.clone(),
            status: self.status,
            row_count: self.row_count,
            execution_time_ms: self.execution_time_ms,
            error_message: self.error_message.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    /// The status read as JSON: the summary, plus `data` when asked for.
    ///
    /// `data` is `null` until the run completes.
    pub fn status_report(&self, include_data: bool) -> Result<Value, AppError> {
        let mut report = serde_json::to_value(self.summary())?;
        if include_data {
            if let Value::Object(fields) = &mut report {
                let data = self.data.clone().map_or(Value::Null, Value::Array);
                fields.insert("data".to_string(), data);
            }
        }
        Ok(report)
    }
}

/// Lightweight view of an execution for listings and status lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub id: ExecutionId,
    pub dataset_id: DatasetId,
    pub status: ExecutionStatus,
    pub row_count: Option<u64>,
    pub execution_time_ms: Option<u64>,
    pub error_message: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}
