//! Domain model: dataset definitions and the execution records they produce.

pub mod dataset;
pub mod execution;

pub use dataset::{DatasetDefinition, EnrichmentSpec, PrimaryQuery};
pub use execution::{
    ErrorDetail, ExecutionRecord, ExecutionStatus, ExecutionSummary, RecordTransition,
};
