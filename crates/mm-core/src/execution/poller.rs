//! Progress poll task
//!
//! One task per active run. The first poll happens one period after the run
//! starts; each successful poll replaces the published snapshot. The task
//! ends on its own once a snapshot is terminal, and is aborted when the
//! [`PollTask`] guard is cancelled or dropped.

use std::sync::Arc;
use std::time::Duration;

use mm_client::MigrationBackend;
use mm_types::{RunId, RunStatus, RunSummary, TableProgress};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Latest progress of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub tables: Vec<TableProgress>,
    pub status: RunStatus,
    /// Number of successful polls so far
    pub revision: u64,
}

impl ProgressSnapshot {
    fn initial() -> Self {
        Self {
            tables: Vec::new(),
            status: RunStatus::Running,
            revision: 0,
        }
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_progress(&self.tables)
    }
}

/// Guard owning the poll task of one run
#[derive(Debug)]
pub struct PollTask {
    run_id: RunId,
    handle: Option<JoinHandle<()>>,
}

impl PollTask {
    /// Start polling `run_id` every `period`
    pub fn spawn<B>(
        backend: Arc<B>,
        run_id: RunId,
        period: Duration,
    ) -> (Self, watch::Receiver<ProgressSnapshot>)
    where
        B: MigrationBackend + ?Sized + 'static,
    {
        let (tx, rx) = watch::channel(ProgressSnapshot::initial());
        let task_run = run_id.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut revision = 0_u64;

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }

                let tables = match backend.fetch_progress(&task_run).await {
                    Ok(tables) => tables,
                    Err(err) => {
                        tracing::warn!(run_id = %task_run, "progress poll failed: {err}");
                        continue;
                    }
                };

                revision += 1;
                let status = RunStatus::from_progress(&tables);
                tracing::debug!(run_id = %task_run, revision, tables = tables.len(), ?status, "progress polled");
                tx.send_replace(ProgressSnapshot {
                    tables,
                    status,
                    revision,
                });

                if status.is_terminal() {
                    tracing::info!(run_id = %task_run, polls = revision, "run reached terminal state");
                    break;
                }
            }
        });

        (
            Self {
                run_id,
                handle: Some(handle),
            },
            rx,
        )
    }

    #[inline]
    #[must_use]
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Task still scheduled
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop polling. Returns `false` if already cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                tracing::debug!(run_id = %self.run_id, "poll task cancelled");
                true
            }
            None => false,
        }
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_test_utils::{progress, Endpoint, MockBackend};
    use mm_types::TableStatus;

    #[tokio::test(start_paused = true)]
    async fn first_poll_waits_one_period() {
        let backend = Arc::new(MockBackend::new());
        backend.script_progress([Ok(vec![progress("orders", TableStatus::Running, 1, 10)])]);
        let (_task, _rx) = PollTask::spawn(Arc::clone(&backend), RunId::new("r1"), Duration::from_secs(2));

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(backend.call_count(Endpoint::Progress), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(backend.call_count(Endpoint::Progress), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_poll_is_skipped() {
        let backend = Arc::new(MockBackend::new());
        backend.script_progress([
            Err(mm_client::ClientError::Network("reset".into())),
            Ok(vec![progress("orders", TableStatus::Running, 5, 10)]),
        ]);
        let (_task, mut rx) = PollTask::spawn(Arc::clone(&backend), RunId::new("r1"), Duration::from_secs(2));

        rx.changed().await.unwrap();
        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.tables[0].rows_processed, 5);
        assert_eq!(backend.call_count(Endpoint::Progress), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_happens_once_and_stops_polling() {
        let backend = Arc::new(MockBackend::new());
        backend.script_progress([Ok(vec![progress("orders", TableStatus::Running, 1, 10)])]);
        let (mut task, _rx) = PollTask::spawn(Arc::clone(&backend), RunId::new("r1"), Duration::from_secs(2));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(backend.call_count(Endpoint::Progress), 2);

        assert!(task.cancel());
        assert!(!task.cancel());
        assert!(!task.is_active());
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(backend.call_count(Endpoint::Progress), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_snapshot_keeps_polling() {
        let backend = Arc::new(MockBackend::new());
        let (_task, rx) = PollTask::spawn(Arc::clone(&backend), RunId::new("r1"), Duration::from_secs(2));

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(backend.call_count(Endpoint::Progress), 3);
        assert_eq!(rx.borrow().status, RunStatus::Running);
    }
}
