//! In-process execution store.

use super::{most_recent, not_found, ExecutionStore};
use crate::error::AppError;
use crate::model::{ExecutionRecord, RecordTransition};
use crate::types::{DatasetId, ExecutionId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Keeps records in a concurrent map keyed by execution id.
///
/// Updates happen under the entry's shard lock, so a transition is checked
/// and applied atomically.
#[derive(Debug, Default)]
pub struct InMemoryExecutionStore {
    records: DashMap<ExecutionId, ExecutionRecord>,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn create(&self, record: ExecutionRecord) -> Result<ExecutionId, AppError> {
        let id = record.id.clone();
        match self.records.entry(id.clone()) {
            Entry::Occupied(_) => Err(AppError::Storage {
                message: format!("execution {} already exists", id),
                source: None,
            }),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(id)
            }
        }
    }

    async fn get(&self, id: &ExecutionId) -> Result<ExecutionRecord, AppError> {
        self.records
            .get(id)
            .map(|record| record.value().clone())
            .ok_or_else(|| not_found(id))
    }

    async fn update(
        &self,
        id: &ExecutionId,
        transition: RecordTransition,
    ) -> Result<ExecutionRecord, AppError> {
        let mut entry = self.records.get_mut(id).ok_or_else(|| not_found(id))?;
        entry.apply(transition)?;
        Ok(entry.value().clone())
    }

    async fn latest_for_dataset(
        &self,
        dataset_id: &DatasetId,
    ) -> Result<Option<ExecutionRecord>, AppError> {
        Ok(most_recent(
            self.records
                .iter()
                .filter(|entry| &entry.dataset_id == dataset_id)
                .map(|entry| entry.value().clone()),
        ))
    }
}
