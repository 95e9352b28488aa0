//! Directory-backed execution store.
//!
//! Each record lives in `<dir>/<execution-id>.json`. Writes go to a
//! temporary file first and are renamed into place, so a concurrent reader
//! sees either the previous state or the new one, never a torn file.

use super::{most_recent, not_found, ExecutionStore};
use crate::error::AppError;
use crate::model::{ExecutionRecord, RecordTransition};
use crate::types::{DatasetId, ExecutionId};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Stores one JSON file per execution under a directory.
pub struct FileExecutionStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileExecutionStore {
    /// Opens (and creates, if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::storage(format!("cannot create store directory {}", dir.display()), e)
        })?;
        log::debug!("Execution store at {}", dir.display());
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Default location: `$XDG_DATA_HOME/dataset-extractor/executions`
    /// (or `~/.local/share/...`).
    pub fn default_dir() -> PathBuf {
        std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local").join("share")
            })
            .join("dataset-extractor")
            .join("executions")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &ExecutionId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_str()))
    }

    async fn read_record(&self, path: &Path) -> Result<ExecutionRecord, AppError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::storage(format!("cannot read {}", path.display()), e)
        })?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::storage(format!("corrupt record {}", path.display()), e))
    }

    async fn write_record(&self, record: &ExecutionRecord) -> Result<(), AppError> {
        let path = self.record_path(&record.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| AppError::storage("cannot serialize record", e))?;

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| AppError::storage(format!("cannot write {}", tmp.display()), e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| AppError::storage(format!("cannot replace {}", path.display()), e))
    }
}

#[async_trait::async_trait]
impl ExecutionStore for FileExecutionStore {
    async fn create(&self, record: ExecutionRecord) -> Result<ExecutionId, AppError> {
        let _guard = self.write_lock.lock().await;
        let path = self.record_path(&record.id);
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| AppError::storage(format!("cannot stat {}", path.display()), e))?;
        if exists {
            return Err(AppError::Storage {
                message: format!("execution {} already exists", record.id),
                source: None,
            });
        }
        self.write_record(&record).await?;
        Ok(record.id)
    }

    async fn get(&self, id: &ExecutionId) -> Result<ExecutionRecord, AppError> {
        let path = self.record_path(id);
        match tokio::fs::metadata(&path).await {
            Ok(_) => self.read_record(&path).await,
            Err(e) if e.kind() == IoErrorKind::NotFound => Err(not_found(id)),
            Err(e) => Err(AppError::storage(format!("cannot stat {}", path.display()), e)),
        }
    }

    async fn update(
        &self,
        id: &ExecutionId,
        transition: RecordTransition,
    ) -> Result<ExecutionRecord, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.get(id).await?;
        record.apply(transition)?;
        self.write_record(&record).await?;
        Ok(record)
    }

    async fn latest_for_dataset(
        &self,
        dataset_id: &DatasetId,
    ) -> Result<Option<ExecutionRecord>, AppError> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::storage(
                    format!("cannot list {}", self.dir.display()),
                    e,
                ))
            }
        };

        let mut matching = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| AppError::storage(format!("cannot list {}", self.dir.display()), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            // A record unreadable here is skipped; `get` reports it directly.
            match self.read_record(&path).await {
                Ok(record) if &record.dataset_id == dataset_id => matching.push(record),
                Ok(_) => {}
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        Ok(most_recent(matching))
    }
}
