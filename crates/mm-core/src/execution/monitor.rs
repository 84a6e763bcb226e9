use std::sync::Arc;
use std::time::Duration;

use mm_client::{ExecuteResponse, MigrationBackend};
use mm_types::{RunSummary, SessionId, TableProgress, TargetCredentials, TargetSummary};
use tokio::sync::watch;

use super::poller::{PollTask, ProgressSnapshot};
use super::{transition, validate_event, EventKind, MonitorEvent, MonitorState};
use crate::config::OrchestratorConfig;
use crate::error::{MigrationError, MigrationResult};

/// Drives target configuration, run start and progress polling for one session
///
/// At most one poll task exists per monitor; it is released when the run
/// turns terminal, on [`ExecutionMonitor::shutdown`], or when the monitor is
/// dropped.
pub struct ExecutionMonitor<B: ?Sized> {
    backend: Arc<B>,
    session_id: SessionId,
    poll_interval: Duration,
    state: MonitorState,
    target: Option<TargetSummary>,
    started: Option<ExecuteResponse>,
    progress: Option<watch::Receiver<ProgressSnapshot>>,
    poller: Option<PollTask>,
}

impl<B: MigrationBackend + ?Sized + 'static> ExecutionMonitor<B> {
    pub fn new(backend: Arc<B>, session_id: SessionId, config: &OrchestratorConfig) -> Self {
        Self {
            backend,
            session_id,
            poll_interval: config.poll_interval(),
            state: MonitorState::Unconfigured,
            target: None,
            started: None,
            progress: None,
            poller: None,
        }
    }

    /// Current state as last applied.
    ///
    /// Progress is pushed by the poll task, which may end on its own at a
    /// terminal snapshot; the state only moves to `Terminal` once that
    /// snapshot is applied through [`Self::update`], [`Self::next_snapshot`]
    /// or [`Self::wait_for_terminal`].
    #[inline]
    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    #[inline]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Configured target; never includes the password
    #[inline]
    pub fn target(&self) -> Option<&TargetSummary> {
        self.target.as_ref()
    }

    /// Acknowledgement of the current run
    #[inline]
    pub fn started(&self) -> Option<&ExecuteResponse> {
        self.started.as_ref()
    }

    /// Whether a poll task is scheduled. Can turn false while [`Self::state`]
    /// still reports `Running`, until [`Self::update`] applies the last snapshot.
    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(PollTask::is_active)
    }

    /// Ask the backend whether the session already has a target.
    ///
    /// Moves straight to `Configured` when it does. Outside `Unconfigured`
    /// no call is made.
    ///
    /// # Errors
    /// Backend failure; the state is left unchanged.
    pub async fn check_configured(&mut self) -> MigrationResult<bool> {
        if self.state != MonitorState::Unconfigured {
            return Ok(true);
        }

        let record = self.backend.fetch_session(&self.session_id).await?;
        let Some(target) = record.target_summary() else {
            tracing::debug!(session_id = %self.session_id, "no target configured");
            return Ok(false);
        };

        self.state = transition(&self.state, MonitorEvent::AlreadyConfigured)?;
        tracing::info!(session_id = %self.session_id, %target, "target already configured");
        self.target = Some(target);
        Ok(true)
    }

    /// Persist target credentials. All five fields are checked locally first.
    ///
    /// # Errors
    /// `IllegalTransition` outside `Unconfigured`, `Validation` for blank
    /// fields (both without a network call), or the backend failure.
    pub async fn configure(&mut self, credentials: TargetCredentials) -> MigrationResult<()> {
        validate_event(&self.state, EventKind::CredentialsSaved)?;

        let missing = credentials.missing_fields();
        if !missing.is_empty() {
            let fields: Vec<String> = missing.iter().map(ToString::to_string).collect();
            return Err(MigrationError::Validation(format!(
                "Please fill in all target database fields (missing: {})",
                fields.join(", ")
            )));
        }

        self.backend
            .save_target_credentials(&self.session_id, &credentials)
            .await?;

        let target = credentials.summary();
        self.state = transition(&self.state, MonitorEvent::CredentialsSaved)?;
        tracing::info!(session_id = %self.session_id, %target, "target credentials saved");
        self.target = Some(target);
        Ok(())
    }

    /// Return to `Unconfigured` to enter a different target
    ///
    /// # Errors
    /// `IllegalTransition` outside `Configured`.
    pub fn reconfigure(&mut self) -> MigrationResult<()> {
        self.state = transition(&self.state, MonitorEvent::Reconfigure)?;
        tracing::info!(session_id = %self.session_id, "target reconfiguration requested");
        Ok(())
    }

    /// Start a run and begin polling its progress.
    ///
    /// # Errors
    /// `IllegalTransition` outside `Configured` (no call is made), or the
    /// backend failure, in which case the monitor stays `Configured`.
    pub async fn start(&mut self) -> MigrationResult<ExecuteResponse> {
        validate_event(&self.state, EventKind::RunStarted)?;

        let response = self.backend.execute(&self.session_id).await.map_err(|err| {
            tracing::info!(session_id = %self.session_id, "run start failed: {err}");
            MigrationError::from(err)
        })?;

        let run_id = response.run_id.clone();
        self.state = transition(&self.state, MonitorEvent::RunStarted(run_id.clone()))?;
        tracing::info!(
            session_id = %self.session_id,
            %run_id,
            mode = response.mode.as_deref().unwrap_or("default"),
            "run started"
        );

        let (poller, progress) = PollTask::spawn(Arc::clone(&self.backend), run_id, self.poll_interval);
        self.poller = Some(poller);
        self.progress = Some(progress);
        self.started = Some(response.clone());
        Ok(response)
    }

    /// Apply the latest snapshot to the state machine; a terminal snapshot
    /// moves `Running` to `Terminal` and releases the poll task
    pub fn update(&mut self) -> &MonitorState {
        let terminal = self.state.is_running()
            && self
                .progress
                .as_ref()
                .is_some_and(|rx| rx.borrow().status.is_terminal());

        if terminal {
            if let Ok(next) = transition(&self.state, MonitorEvent::RunCompleted) {
                self.state = next;
                if let Some(mut poller) = self.poller.take() {
                    poller.cancel();
                }
                let summary = self.summary();
                tracing::info!(
                    session_id = %self.session_id,
                    completed = summary.completed,
                    failed = summary.failed,
                    rows = summary.rows_processed,
                    "run finished"
                );
            }
        }
        &self.state
    }

    /// Latest progress snapshot, if a run was started
    pub fn snapshot(&self) -> Option<ProgressSnapshot> {
        self.progress.as_ref().map(|rx| rx.borrow().clone())
    }

    /// Tables of the latest snapshot
    pub fn progress(&self) -> Vec<TableProgress> {
        self.snapshot().map(|s| s.tables).unwrap_or_default()
    }

    /// Aggregate over the latest snapshot
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_progress(&self.progress())
    }

    /// Wait for the next published snapshot.
    ///
    /// `None` when no run is being polled.
    pub async fn next_snapshot(&mut self) -> Option<ProgressSnapshot> {
        if !self.state.is_running() {
            return None;
        }
        let rx = self.progress.as_mut()?;
        let changed = rx.changed().await;
        let snapshot = rx.borrow_and_update().clone();
        if changed.is_err() && !snapshot.status.is_terminal() {
            return None;
        }
        self.update();
        Some(snapshot)
    }

    /// Follow the run until it is terminal or polling stops.
    ///
    /// # Errors
    /// `IllegalTransition` when no run was started.
    pub async fn wait_for_terminal(&mut self) -> MigrationResult<RunSummary> {
        if self.state.run_id().is_none() {
            return Err(MigrationError::IllegalTransition {
                from: self.state.name(),
                event: "wait for the run",
            });
        }
        while self.next_snapshot().await.is_some() {}
        Ok(self.summary())
    }

    /// Tear down: cancel the poll task if one is still scheduled
    pub fn shutdown(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.cancel();
            tracing::info!(session_id = %self.session_id, "execution monitor shut down");
        }
    }
}
