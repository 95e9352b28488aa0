// src/polling.rs
//! The consumer side of an execution: read the record on a timer until it
//! reaches a terminal state, or until the poll budget runs out.
//!
//! Polling only ever reads. Dropping the polling future stops polling and
//! nothing else; the run it watches carries on.

use crate::constants::{
    MAX_CONSECUTIVE_POLL_ERRORS, MAX_POLL_COUNT, POLL_INTERVAL_MS, PROGRESS_CEILING_WHILE_RUNNING,
};
use crate::error::{AppError, ErrorKind};
use crate::model::{ExecutionRecord, ExecutionStatus};
use crate::store::ExecutionStore;
use crate::types::ExecutionId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Bounds on how long and how hard a consumer polls.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    pub max_poll_count: u32,
    pub interval: Duration,
    pub max_consecutive_errors: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_poll_count: MAX_POLL_COUNT,
            interval: Duration::from_millis(POLL_INTERVAL_MS),
            max_consecutive_errors: MAX_CONSECUTIVE_POLL_ERRORS,
        }
    }
}

/// What a consumer shows for an execution at a given moment.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    /// Status not known yet, or the record is not visible yet.
    Loading,
    /// The run is in flight.
    InProgress { progress: u8 },
    /// Reading the status failed; polling may continue.
    Error { message: String },
    /// The run failed. Polling again will not change that; triggering
    /// a new run might.
    Failed {
        message: String,
        kind: Option<ErrorKind>,
    },
    /// The run completed and its data is available.
    Success { record: Box<ExecutionRecord> },
    /// The poll budget ran out before the run finished.
    TimedOut { polls: u32 },
}

impl PollState {
    /// Whether polling stops at this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Failed { .. } | Self::Success { .. } | Self::TimedOut { .. }
        )
    }

    /// Progress to display, if this state has one.
    pub fn progress(&self) -> Option<u8> {
        match self {
            Self::InProgress { progress } => Some(*progress),
            Self::Success { .. } => Some(100),
            _ => None,
        }
    }

    /// Whether the consumer should offer to start a fresh run.
    pub fn offers_retry(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::TimedOut { .. })
    }
}

/// Progress while a run is in flight: `min(round(polls / max * 100), 99)`.
pub fn progress_percent(poll_count: u32, max_poll_count: u32) -> u8 {
    if max_poll_count == 0 {
        return PROGRESS_CEILING_WHILE_RUNNING;
    }
    let percent = (f64::from(poll_count) / f64::from(max_poll_count) * 100.0).round();
    percent.min(f64::from(PROGRESS_CEILING_WHILE_RUNNING)) as u8
}

/// Maps one status read onto the consumer's state.
pub fn observe(
    read: Result<ExecutionRecord, AppError>,
    poll_count: u32,
    settings: &PollSettings,
) -> PollState {
    match read {
        // Polled before the creating write became visible.
        Err(e) if e.is_not_found() => PollState::Loading,
        Err(e) => PollState::Error {
            message: e.to_string(),
        },
        Ok(record) => match record.status {
            ExecutionStatus::Pending => PollState::Loading,
            ExecutionStatus::Running => PollState::InProgress {
                progress: progress_percent(poll_count, settings.max_poll_count),
            },
            ExecutionStatus::Completed => PollState::Success {
                record: Box::new(record),
            },
            ExecutionStatus::Failed => PollState::Failed {
                message: record
                    .failure_message()
                    .unwrap_or("execution failed without a message")
                    .to_string(),
                kind: record.error_detail.as_ref().map(|detail| detail.kind),
            },
        },
    }
}

/// Polls an [`ExecutionStore`] for one execution.
pub struct ExecutionPoller {
    store: Arc<dyn ExecutionStore>,
    settings: PollSettings,
}

impl ExecutionPoller {
    pub fn new(store: Arc<dyn ExecutionStore>, settings: PollSettings) -> Self {
        Self { store, settings }
    }

    /// Reads the record until it is terminal, reporting every state.
    ///
    /// Returns the final state: `Success`, `Failed`, `TimedOut`, or `Error`
    /// once too many reads in a row have failed.
    pub async fn poll_until_terminal(
        &self,
        id: &ExecutionId,
        mut on_state: impl FnMut(&PollState),
    ) -> PollState {
        let period = self.settings.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_errors = 0u32;

        on_state(&PollState::Loading);

        for poll in 1..=self.settings.max_poll_count {
            ticker.tick().await;
            let state = observe(self.store.get(id).await, poll, &self.settings);
            on_state(&state);

            if state.is_terminal() {
                log::debug!("Execution {} reached a final state after {} polls", id, poll);
                return state;
            }

            if let PollState::Error { message } = &state {
                consecutive_errors += 1;
                log::warn!(
                    "Status read {} for {} failed ({}/{}): {}",
                    poll,
                    id,
                    consecutive_errors,
                    self.settings.max_consecutive_errors,
                    message
                );
                if consecutive_errors >= self.settings.max_consecutive_errors {
                    return state;
                }
            } else {
                consecutive_errors = 0;
            }
        }

        log::warn!(
            "Execution {} still running after {} polls",
            id,
            self.settings.max_poll_count
        );
        let timed_out = PollState::TimedOut {
            polls: self.settings.max_poll_count,
        };
        on_state(&timed_out);
        timed_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ErrorDetail, RecordTransition};
    use crate::types::DatasetId;
    use chrono::Utc;
    use serde_json::Map;

    fn running() -> ExecutionRecord {
        let mut record = ExecutionRecord::pending(DatasetId::parse("orders").unwrap());
        record.apply(RecordTransition::Running).unwrap();
        record
    }

    #[test]
    fn test_progress_is_capped_at_ceiling() {
        assert_eq!(progress_percent(0, 60), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(59, 60), 98);
        assert_eq!(progress_percent(60, 60), 99);
        assert_eq!(progress_percent(500, 60), 99);
        assert_eq!(progress_percent(60, 60), PROGRESS_CEILING_WHILE_RUNNING);
        assert_eq!(progress_percent(7, 0), PROGRESS_CEILING_WHILE_RUNNING);
    }

    #[test]
    fn test_observe_read_after_write_race_is_loading() {
        let settings = PollSettings::default();
        let missing = Err(AppError::NotFound {
            entity: "execution",
            id: "x".to_string(),
        });
        assert_eq!(observe(missing, 1, &settings), PollState::Loading);

        let pending = ExecutionRecord::pending(DatasetId::parse("orders").unwrap());
        assert_eq!(observe(Ok(pending), 1, &settings), PollState::Loading);
    }

    #[test]
    fn test_observe_storage_failure_is_error_not_failed() {
        let state = observe(
            Err(AppError::Storage {
                message: "disk unavailable".to_string(),
                source: None,
            }),
            1,
            &PollSettings::default(),
        );
        assert!(matches!(state, PollState::Error { .. }));
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_observe_terminal_states() {
        let settings = PollSettings {
            max_poll_count: 10,
            ..PollSettings::default()
        };
        assert_eq!(
            observe(Ok(running()), 5, &settings),
            PollState::InProgress { progress: 50 }
        );

        let mut failed = running();
        failed
            .apply(RecordTransition::Failed {
                error: ErrorDetail::from_error(&AppError::Query {
                    message: "Throttled".to_string(),
                }),
                end_time: Utc::now(),
                metadata: Map::new(),
            })
            .unwrap();
        let state = observe(Ok(failed), 6, &settings);
        assert_eq!(
            state,
            PollState::Failed {
                message: "Upstream query error: Throttled".to_string(),
                kind: Some(ErrorKind::Query),
            }
        );
        assert!(state.offers_retry());

        let mut completed = running();
        completed
            .apply(RecordTransition::Completed {
                data: vec![],
                end_time: Utc::now(),
                metadata: Map::new(),
            })
            .unwrap();
        let state = observe(Ok(completed), 7, &settings);
        assert_eq!(state.progress(), Some(100));
        assert!(state.is_terminal());
    }
}
