// src/catalog.rs
//! Where dataset definitions and source credentials come from.
//!
//! Both are owned by the surrounding source configuration; the orchestrator
//! only reads them when a run is triggered.

use crate::error::AppError;
use crate::model::DatasetDefinition;
use crate::types::{DatasetId, SourceCredentials};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Resolves a dataset id into everything needed to start a run.
#[async_trait::async_trait]
pub trait DatasetCatalog: Send + Sync {
    /// The definition for `id`; `AppError::NotFound` when unknown.
    async fn definition(&self, id: &DatasetId) -> Result<DatasetDefinition, AppError>;

    /// Credentials for the source behind `definition`;
    /// `AppError::MissingConfiguration` when none are configured.
    async fn credentials(
        &self,
        definition: &DatasetDefinition,
    ) -> Result<SourceCredentials, AppError>;
}

/// A catalog held in memory: a set of definitions sharing one source.
#[derive(Default)]
pub struct StaticCatalog {
    definitions: RwLock<HashMap<DatasetId, DatasetDefinition>>,
    credentials: RwLock<Option<SourceCredentials>>,
}

impl StaticCatalog {
    pub fn new(credentials: Option<SourceCredentials>) -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
            credentials: RwLock::new(credentials),
        }
    }

    /// Adds or replaces a definition.
    pub fn register(&self, definition: DatasetDefinition) {
        self.definitions
            .write()
            .insert(definition.id.clone(), definition);
    }

    pub fn set_credentials(&self, credentials: Option<SourceCredentials>) {
        *self.credentials.write() = credentials;
    }
}

#[async_trait::async_trait]
impl DatasetCatalog for StaticCatalog {
    async fn definition(&self, id: &DatasetId) -> Result<DatasetDefinition, AppError> {
        self.definitions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound {
                entity: "dataset",
                id: id.to_string(),
            })
    }

    async fn credentials(
        &self,
        definition: &DatasetDefinition,
    ) -> Result<SourceCredentials, AppError> {
        self.credentials.read().clone().ok_or_else(|| {
            AppError::MissingConfiguration(format!(
                "no source credentials configured for dataset {}",
                definition.id
            ))
        })
    }
}
