//! Persistence boundary for execution records.
//!
//! The orchestrator writes through this trait; polling consumers read
//! through it. Implementations enforce forward-only status transitions, so
//! a second writer on the same record is refused rather than silently
//! overwriting a terminal state.

pub mod file;
pub mod memory;

use crate::error::AppError;
use crate::model::{ExecutionRecord, RecordTransition};
use crate::types::{DatasetId, ExecutionId};

/// The ability to store and retrieve execution records.
#[async_trait::async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persists a new record, returning its id.
    async fn create(&self, record: ExecutionRecord) -> Result<ExecutionId, AppError>;

    /// Reads a record; `AppError::NotFound` when no record has this id.
    async fn get(&self, id: &ExecutionId) -> Result<ExecutionRecord, AppError>;

    /// Applies a transition and returns the updated record.
    async fn update(
        &self,
        id: &ExecutionId,
        transition: RecordTransition,
    ) -> Result<ExecutionRecord, AppError>;

    /// The most recently started execution of a dataset, if any.
    async fn latest_for_dataset(
        &self,
        dataset_id: &DatasetId,
    ) -> Result<Option<ExecutionRecord>, AppError>;
}

/// Picks the record with the latest start time.
pub(crate) fn most_recent(
    records: impl IntoIterator<Item = ExecutionRecord>,
) -> Option<ExecutionRecord> {
    records.into_iter().max_by_key(|record| record.start_time)
}

pub(crate) fn not_found(id: &ExecutionId) -> AppError {
    AppError::NotFound {
        entity: "execution",
        id: id.to_string(),
    }
}

pub use file::FileExecutionStore;
pub use memory::InMemoryExecutionStore;
