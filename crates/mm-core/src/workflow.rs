//! End-to-end workflow
//!
//! Wires the components in data-flow order: probe, resolve the session,
//! analyze (or load the saved analysis), then generate a plan or hand over to
//! an [`ExecutionMonitor`].

use std::sync::Arc;

use mm_client::MigrationBackend;
use mm_types::{ConnectionDescriptor, ConnectionStringError, MigrationPlan, UserId};

use crate::analysis::{AnalysisOrchestrator, AnalysisOutcome, LoadReport};
use crate::config::OrchestratorConfig;
use crate::error::{MigrationError, MigrationResult};
use crate::execution::ExecutionMonitor;
use crate::plan::PlanGenerator;
use crate::probe::{ConnectionProbe, ProbeOutcome};
use crate::session::{ResolvedSession, SessionResolver};

/// Shown when a resumed session already carries an analysis
pub const EXISTING_ANALYSIS_MESSAGE: &str = "Analysis loaded from saved data";

/// Result of [`MigrationWorkflow::test_connection`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCheck {
    pub probe: ProbeOutcome,
    /// Resolved only when the probe succeeded
    pub session: Option<ResolvedSession>,
    /// Present when a saved analysis was loaded
    pub existing_analysis: Option<LoadReport>,
}

impl ConnectionCheck {
    /// Status line for the operator
    #[must_use]
    pub fn message(&self) -> &str {
        if self.existing_analysis.is_some() {
            EXISTING_ANALYSIS_MESSAGE
        } else {
            &self.probe.message
        }
    }
}

/// Session-scoped orchestration for one operator
pub struct MigrationWorkflow<B: ?Sized> {
    backend: Arc<B>,
    config: OrchestratorConfig,
    user: Option<UserId>,
    connection: ConnectionDescriptor,
    probe: ConnectionProbe<B>,
    resolver: SessionResolver<B>,
    analysis: AnalysisOrchestrator<B>,
    plans: PlanGenerator<B>,
    session: Option<ResolvedSession>,
    existing_analysis: bool,
}

impl<B: MigrationBackend + ?Sized + 'static> MigrationWorkflow<B> {
    pub fn new(backend: Arc<B>, config: OrchestratorConfig, user: Option<UserId>) -> Self {
        Self {
            probe: ConnectionProbe::new(Arc::clone(&backend)),
            resolver: SessionResolver::new(Arc::clone(&backend)),
            analysis: AnalysisOrchestrator::new(Arc::clone(&backend), config.clone()),
            plans: PlanGenerator::new(Arc::clone(&backend)),
            backend,
            config,
            user,
            connection: ConnectionDescriptor::default(),
            session: None,
            existing_analysis: false,
        }
    }

    #[inline]
    pub fn connection(&self) -> &ConnectionDescriptor {
        &self.connection
    }

    /// Replace the source connection. The resolved session no longer
    /// applies and is dropped until the next connection test.
    pub fn set_connection(&mut self, connection: ConnectionDescriptor) {
        self.connection = connection;
        self.detach_session();
    }

    /// Decompose a connection string into the source connection
    ///
    /// # Errors
    /// Malformed string; the connection and session are left unchanged.
    pub fn apply_connection_string(&mut self, raw: &str) -> Result<(), ConnectionStringError> {
        self.connection.apply_connection_string(raw)?;
        self.detach_session();
        Ok(())
    }

    /// Forget the session and everything loaded for it
    fn detach_session(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!(session_id = %session.session_id, "session detached");
        }
        self.existing_analysis = false;
        self.analysis.reset();
    }

    #[inline]
    pub fn session(&self) -> Option<&ResolvedSession> {
        self.session.as_ref()
    }

    #[inline]
    pub fn analysis(&self) -> &AnalysisOrchestrator<B> {
        &self.analysis
    }

    /// Whether the shown analysis came from a previous visit
    #[inline]
    pub fn has_existing_analysis(&self) -> bool {
        self.existing_analysis
    }

    /// Probe the source, then resolve its session and load any saved analysis.
    ///
    /// A failed probe is returned as data with no session resolved.
    ///
    /// # Errors
    /// Session resolution failures, e.g. `NotAuthenticated`.
    pub async fn test_connection(&mut self) -> MigrationResult<ConnectionCheck> {
        self.existing_analysis = false;

        let probe = self.probe.probe(&self.connection).await;
        if !probe.success {
            self.detach_session();
            return Ok(ConnectionCheck {
                probe,
                session: None,
                existing_analysis: None,
            });
        }

        let session = match self.resolver.resolve(self.user.as_ref(), &self.connection).await {
            Ok(session) => session,
            Err(err) => {
                self.detach_session();
                return Err(err);
            }
        };

        if self.session.as_ref().map(|s| &s.session_id) != Some(&session.session_id) {
            self.analysis.reset();
        }
        self.session = Some(session.clone());

        let existing_analysis = if session.has_analysis {
            self.analysis
                .restore_timestamp(session.last_analyzed_at.as_deref());
            let report = self.analysis.load_existing(&session.session_id).await;
            self.existing_analysis = true;
            tracing::info!(session_id = %session.session_id, "{EXISTING_ANALYSIS_MESSAGE}");
            Some(report)
        } else {
            None
        };

        Ok(ConnectionCheck {
            probe,
            session: Some(session),
            existing_analysis,
        })
    }

    /// Run (or re-run) discovery on the resolved session
    ///
    /// # Errors
    /// `MissingSession` before a successful connection test; analysis failures otherwise.
    pub async fn run_analysis(&mut self) -> MigrationResult<AnalysisOutcome> {
        let session = self.session.as_mut().ok_or(MigrationError::MissingSession)?;
        let outcome = self
            .analysis
            .analyze(&session.session_id, &self.connection)
            .await?;
        session.has_analysis = true;
        self.existing_analysis = false;
        Ok(outcome)
    }

    /// Whether plan generation is currently possible
    pub fn can_generate_plan(&self) -> bool {
        self.session.is_some() && PlanGenerator::<B>::is_enabled(self.analysis.artifacts())
    }

    /// Generate the migration plan for the resolved session
    ///
    /// # Errors
    /// `MissingSession`, `PlanPrerequisite`, or the backend failure.
    pub async fn generate_plan(&mut self) -> MigrationResult<MigrationPlan> {
        let session = self.session.as_mut().ok_or(MigrationError::MissingSession)?;
        let plan = self
            .plans
            .generate(&session.session_id, self.analysis.artifacts_mut())
            .await?;
        session.has_migration_plan = true;
        Ok(plan)
    }

    /// Execution monitor bound to the resolved session
    ///
    /// # Errors
    /// `MissingSession` before a successful connection test.
    pub fn execution_monitor(&self) -> MigrationResult<ExecutionMonitor<B>> {
        let session = self.session.as_ref().ok_or(MigrationError::MissingSession)?;
        Ok(ExecutionMonitor::new(
            Arc::clone(&self.backend),
            session.session_id.clone(),
            &self.config,
        ))
    }
}
