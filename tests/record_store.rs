// tests/record_store.rs
//! Behaviour shared by both execution store implementations.

use chrono::{Duration, Utc};
use dataset_extractor::{
    AppError, DatasetId, ErrorDetail, ExecutionId, ExecutionRecord, ExecutionStatus,
    ExecutionStore, FileExecutionStore, InMemoryExecutionStore, RecordTransition,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Map};
use std::sync::Arc;

async fn stores() -> Vec<(&'static str, Arc<dyn ExecutionStore>)> {
    let dir = std::env::temp_dir().join(format!("dataset-extractor-test-{}", uuid::Uuid::new_v4()));
    vec![
        ("memory", Arc::new(InMemoryExecutionStore::new())),
        ("file", Arc::new(FileExecutionStore::open(dir).await.unwrap())),
    ]
}

fn dataset(name: &str) -> DatasetId {
    DatasetId::parse(name).unwrap()
}

#[tokio::test]
async fn test_latest_for_unknown_dataset_is_none() {
    for (name, store) in stores().await {
        let latest = store.latest_for_dataset(&dataset("never-run")).await.unwrap();
        assert!(latest.is_none(), "{}", name);
    }
}

#[tokio::test]
async fn test_get_unknown_is_not_found() {
    for (name, store) in stores().await {
        let result = store.get(&ExecutionId::new_v4()).await;
        assert!(
            matches!(result, Err(AppError::NotFound { entity: "execution", .. })),
            "{}",
            name
        );
    }
}

#[tokio::test]
async fn test_latest_orders_by_start_time() {
    let now = Utc::now();
    for (name, store) in stores().await {
        let older = ExecutionRecord::pending_at(dataset("orders"), now - Duration::minutes(10));
        let newest = ExecutionRecord::pending_at(dataset("orders"), now);
        let middle = ExecutionRecord::pending_at(dataset("orders"), now - Duration::minutes(5));
        let other = ExecutionRecord::pending_at(dataset("products"), now + Duration::minutes(1));

        let newest_id = store.create(newest).await.unwrap();
        store.create(older).await.unwrap();
        store.create(middle).await.unwrap();
        store.create(other).await.unwrap();

        let latest = store
            .latest_for_dataset(&dataset("orders"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, newest_id, "{}", name);
    }
}

#[tokio::test]
async fn test_completed_and_failed_invariants_survive_storage() {
    for (name, store) in stores().await {
        let ok_id = store
            .create(ExecutionRecord::pending(dataset("orders")))
            .await
            .unwrap();
        store.update(&ok_id, RecordTransition::Running).await.unwrap();
        store
            .update(
                &ok_id,
                RecordTransition::Completed {
                    data: vec![json!({"id": 1}), json!({"id": 2})],
                    end_time: Utc::now(),
                    metadata: Map::new(),
                },
            )
            .await
            .unwrap();

        let completed = store.get(&ok_id).await.unwrap();
        assert_eq!(completed.status, ExecutionStatus::Completed, "{}", name);
        assert_eq!(completed.row_count, Some(2));
        assert_eq!(completed.data.as_ref().map(Vec::len), Some(2));
        assert!(completed.error_message.is_none());
        assert!(completed.end_time.unwrap() >= completed.start_time);

        let failed_id = store
            .create(ExecutionRecord::pending(dataset("orders")))
            .await
            .unwrap();
        store
            .update(&failed_id, RecordTransition::Running)
            .await
            .unwrap();
        store
            .update(
                &failed_id,
                RecordTransition::Failed {
                    error: ErrorDetail::from_error(&AppError::Query {
                        message: "Access denied".to_string(),
                    }),
                    end_time: Utc::now(),
                    metadata: Map::new(),
                },
            )
            .await
            .unwrap();

        let failed = store.get(&failed_id).await.unwrap();
        assert_eq!(failed.status, ExecutionStatus::Failed, "{}", name);
        assert!(failed.data.is_none());
        assert!(failed.row_count.is_none());
        assert!(failed.failure_message().unwrap().contains("Access denied"));
    }
}

#[tokio::test]
async fn test_pending_cannot_jump_to_terminal() {
    for (name, store) in stores().await {
        let id = store
            .create(ExecutionRecord::pending(dataset("orders")))
            .await
            .unwrap();
        let result = store
            .update(
                &id,
                RecordTransition::Completed {
                    data: vec![],
                    end_time: Utc::now(),
                    metadata: Map::new(),
                },
            )
            .await;
        assert!(
            matches!(result, Err(AppError::InvalidTransition { .. })),
            "{}",
            name
        );
        assert_eq!(store.get(&id).await.unwrap().status, ExecutionStatus::Pending);
    }
}
