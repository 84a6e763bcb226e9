//! Analysis orchestration
//!
//! Triggers discovery on the backend and keeps the four derived artifact
//! sets of the current session:
//! - schema fields grouped by collection
//! - detected relationships
//! - detected risks
//! - the migration plan, when one exists
//!
//! Every load replaces the previous value; nothing is merged. A new analysis
//! supersedes the previous snapshot entirely.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use mm_client::{AnalysisResponse, AnalyzeRequest, ClientError, MigrationBackend};
use mm_types::{
    AnalysisSnapshot, ConnectionDescriptor, MigrationPlan, Relationship, Risk, SchemaCatalog,
    SessionId, Severity,
};
use serde::Serialize;

use crate::config::OrchestratorConfig;
use crate::error::{MigrationError, MigrationResult};

/// Lifecycle of the analysis view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    Idle,
    Running,
    Loaded,
}

/// Whether the next analysis is the first one or a re-run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalysisKind {
    Initial,
    Reanalysis,
}

/// One of the four derived artifact sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArtifactKind {
    Schema,
    Relationships,
    Risks,
    Plan,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Schema => "schema",
            Self::Relationships => "relationships",
            Self::Risks => "risks",
            Self::Plan => "plan",
        };
        f.write_str(name)
    }
}

/// Artifact sets of the current session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifacts {
    pub schema: SchemaCatalog,
    pub relationships: Vec<Relationship>,
    pub risks: Vec<Risk>,
    pub plan: Option<MigrationPlan>,
}

impl Artifacts {
    /// Risks grouped by severity, most severe first
    #[must_use]
    pub fn risks_by_severity(&self) -> Vec<(Severity, Vec<&Risk>)> {
        Risk::by_severity(&self.risks)
    }
}

/// Which artifact loads failed in a fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub failed: Vec<(ArtifactKind, MigrationError)>,
}

impl LoadReport {
    /// All four loads applied
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Whether a given artifact failed to load
    #[must_use]
    pub fn failed_kind(&self, kind: ArtifactKind) -> bool {
        self.failed.iter().any(|(k, _)| *k == kind)
    }
}

/// Result of a successful analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub kind: AnalysisKind,
    pub message: Option<String>,
    pub snapshot: AnalysisSnapshot,
    pub loads: LoadReport,
}

/// Drives discovery and artifact retrieval for one session at a time
pub struct AnalysisOrchestrator<B: ?Sized> {
    backend: Arc<B>,
    config: OrchestratorConfig,
    status: AnalysisStatus,
    last_analyzed_at: Option<DateTime<Utc>>,
    snapshot: Option<AnalysisSnapshot>,
    artifacts: Artifacts,
}

impl<B: MigrationBackend + ?Sized> AnalysisOrchestrator<B> {
    pub fn new(backend: Arc<B>, config: OrchestratorConfig) -> Self {
        Self {
            backend,
            config,
            status: AnalysisStatus::Idle,
            last_analyzed_at: None,
            snapshot: None,
            artifacts: Artifacts::default(),
        }
    }

    #[inline]
    pub fn status(&self) -> AnalysisStatus {
        self.status
    }

    #[inline]
    pub fn last_analyzed_at(&self) -> Option<DateTime<Utc>> {
        self.last_analyzed_at
    }

    #[inline]
    pub fn snapshot(&self) -> Option<&AnalysisSnapshot> {
        self.snapshot.as_ref()
    }

    #[inline]
    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    #[inline]
    pub fn artifacts_mut(&mut self) -> &mut Artifacts {
        &mut self.artifacts
    }

    /// Presentational label for the next [`Self::analyze`] call
    pub fn analysis_kind(&self) -> AnalysisKind {
        if self.status == AnalysisStatus::Loaded || self.last_analyzed_at.is_some() {
            AnalysisKind::Reanalysis
        } else {
            AnalysisKind::Initial
        }
    }

    /// Record when the session was last analyzed, as reported by the backend
    pub fn restore_timestamp(&mut self, last_analyzed_at: Option<&str>) {
        if let Some(at) = last_analyzed_at.and_then(parse_timestamp) {
            self.last_analyzed_at = Some(at);
        }
    }

    /// Forget everything about the previous session
    pub fn reset(&mut self) {
        self.status = AnalysisStatus::Idle;
        self.last_analyzed_at = None;
        self.snapshot = None;
        self.artifacts = Artifacts::default();
    }

    /// Run discovery, then load all four artifact sets.
    ///
    /// On failure the status reverts to what it was; stored artifacts are untouched.
    ///
    /// # Errors
    /// Backend failure, or a response reporting `success: false`.
    pub async fn analyze(
        &mut self,
        session_id: &SessionId,
        connection: &ConnectionDescriptor,
    ) -> MigrationResult<AnalysisOutcome> {
        let kind = self.analysis_kind();
        let previous = self.status;
        self.status = AnalysisStatus::Running;

        let request = AnalyzeRequest {
            db_connection: connection.resolved(),
            sample_size: self.config.sample_size,
            include_ai: self.config.include_ai,
        };
        tracing::info!(%session_id, ?kind, sample_size = request.sample_size, "analysis started");

        let response = match self.backend.analyze(session_id, &request).await {
            Ok(response) if response.success => response,
            Ok(response) => {
                self.status = previous;
                let err = MigrationError::from(ClientError::Rejected(failure_message(&response)));
                tracing::info!(%session_id, "analysis rejected: {err}");
                return Err(err);
            }
            Err(err) => {
                self.status = previous;
                tracing::info!(%session_id, "analysis failed: {err}");
                return Err(err.into());
            }
        };

        let now = Utc::now();
        let snapshot = AnalysisSnapshot {
            collections: response.collections,
            field_counts_by_collection: response.collection_field_counts,
            relationship_count: response.relationship_count,
            risk_count: response.risk_count,
            timestamp: now,
        };
        self.status = AnalysisStatus::Loaded;
        self.last_analyzed_at = Some(now);
        self.snapshot = Some(snapshot.clone());
        tracing::info!(
            %session_id,
            collections = snapshot.collections.len(),
            relationships = snapshot.relationship_count,
            risks = snapshot.risk_count,
            "analysis completed"
        );

        let loads = self.load_existing(session_id).await;
        Ok(AnalysisOutcome {
            kind,
            message: response.message,
            snapshot,
            loads,
        })
    }

    /// Load all four artifact sets concurrently.
    ///
    /// Each load is applied on its own; failures are logged and reported,
    /// never propagated, and never prevent the other loads from applying.
    pub async fn load_existing(&mut self, session_id: &SessionId) -> LoadReport {
        let backend = &self.backend;
        let (schema, relationships, risks, plan) = futures::join!(
            backend.fetch_schema(session_id),
            backend.fetch_relationships(session_id),
            backend.fetch_risks(session_id),
            backend.fetch_plan(session_id),
        );

        let mut report = LoadReport::default();
        let mut note = |kind: ArtifactKind, err: ClientError| {
            tracing::warn!(%session_id, artifact = %kind, "artifact load failed: {err}");
            report.failed.push((kind, err.into()));
        };

        match schema {
            Ok(response) => self.artifacts.schema = response.collections,
            Err(err) => note(ArtifactKind::Schema, err),
        }
        match relationships {
            Ok(response) => self.artifacts.relationships = response.relationships,
            Err(err) => note(ArtifactKind::Relationships, err),
        }
        match risks {
            Ok(response) => self.artifacts.risks = response.risks,
            Err(err) => note(ArtifactKind::Risks, err),
        }
        match plan {
            Ok(plan) => self.artifacts.plan = Some(plan),
            Err(err) => note(ArtifactKind::Plan, err),
        }

        if report.failed.len() < 4 && self.status != AnalysisStatus::Running {
            self.status = AnalysisStatus::Loaded;
        }
        tracing::debug!(%session_id, failed = report.failed.len(), "artifact fan-out settled");
        report
    }

    /// Replace the schema with the server's current copy
    ///
    /// # Errors
    /// Backend failure; the stored schema is kept.
    pub async fn load_schema(&mut self, session_id: &SessionId) -> MigrationResult<()> {
        self.artifacts.schema = self.backend.fetch_schema(session_id).await?.collections;
        Ok(())
    }

    /// Replace the relationships with the server's current copy
    ///
    /// # Errors
    /// Backend failure; the stored relationships are kept.
    pub async fn load_relationships(&mut self, session_id: &SessionId) -> MigrationResult<()> {
        self.artifacts.relationships = self
            .backend
            .fetch_relationships(session_id)
            .await?
            .relationships;
        Ok(())
    }

    /// Replace the risks with the server's current copy
    ///
    /// # Errors
    /// Backend failure; the stored risks are kept.
    pub async fn load_risks(&mut self, session_id: &SessionId) -> MigrationResult<()> {
        self.artifacts.risks = self.backend.fetch_risks(session_id).await?.risks;
        Ok(())
    }

    /// Replace the plan with the server's current copy
    ///
    /// # Errors
    /// Backend failure; the stored plan is kept.
    pub async fn load_plan(&mut self, session_id: &SessionId) -> MigrationResult<()> {
        self.artifacts.plan = Some(self.backend.fetch_plan(session_id).await?);
        Ok(())
    }
}

fn failure_message(response: &AnalysisResponse) -> String {
    response
        .error
        .clone()
        .or_else(|| response.message.clone())
        .unwrap_or_else(|| "Analysis failed".to_string())
}

/// Accepts RFC 3339 and zone-less ISO timestamps (read as UTC).
/// Zone-less values may omit zero seconds (`2026-10-01T08:00`).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|at| at.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_test_utils::{sample_connection, sample_plan, Endpoint, MockBackend};

    fn session(backend: &MockBackend) -> SessionId {
        backend.seed_session(&mm_test_utils::sample_session_key(), false)
    }

    #[tokio::test]
    async fn analyze_loads_snapshot_and_artifacts() {
        let backend = Arc::new(MockBackend::seeded());
        let id = session(&backend);
        let mut orchestrator = AnalysisOrchestrator::new(Arc::clone(&backend), OrchestratorConfig::new());
        assert_eq!(orchestrator.analysis_kind(), AnalysisKind::Initial);

        let outcome = orchestrator.analyze(&id, &sample_connection()).await.unwrap();
        assert_eq!(outcome.kind, AnalysisKind::Initial);
        assert_eq!(outcome.snapshot.relationship_count, 3);
        assert_eq!(outcome.snapshot.risk_count, 1);
        assert_eq!(orchestrator.status(), AnalysisStatus::Loaded);
        assert!(orchestrator.last_analyzed_at().is_some());
        assert_eq!(orchestrator.artifacts().schema.collection_count(), 5);
        // no plan stored yet
        assert!(outcome.loads.failed_kind(ArtifactKind::Plan));
        assert_eq!(orchestrator.analysis_kind(), AnalysisKind::Reanalysis);

        let request = &backend.analyze_requests()[0];
        assert_eq!(request.sample_size, 1000);
        assert!(!request.include_ai);
    }

    #[tokio::test]
    async fn failed_analysis_keeps_previous_state() {
        let backend = Arc::new(MockBackend::seeded());
        let id = session(&backend);
        let mut orchestrator = AnalysisOrchestrator::new(Arc::clone(&backend), OrchestratorConfig::new());
        orchestrator.analyze(&id, &sample_connection()).await.unwrap();
        let before = orchestrator.artifacts().clone();

        backend.fail(Endpoint::Analyze, ClientError::Rejected("sampling failed".into()));
        let err = orchestrator.analyze(&id, &sample_connection()).await.unwrap_err();
        assert_eq!(err.operator_message(), "sampling failed");
        assert_eq!(orchestrator.status(), AnalysisStatus::Loaded);
        assert_eq!(orchestrator.artifacts(), &before);
        assert_eq!(backend.call_count(Endpoint::Analyze), 2);
    }

    #[tokio::test]
    async fn failed_first_analysis_returns_to_idle() {
        let backend = Arc::new(MockBackend::seeded());
        let id = session(&backend);
        backend.fail(Endpoint::Analyze, ClientError::Network("refused".into()));
        let mut orchestrator = AnalysisOrchestrator::new(backend, OrchestratorConfig::new());
        assert!(orchestrator.analyze(&id, &sample_connection()).await.is_err());
        assert_eq!(orchestrator.status(), AnalysisStatus::Idle);
        assert!(orchestrator.snapshot().is_none());
    }

    #[tokio::test]
    async fn loaders_replace_previous_values() {
        let backend = Arc::new(MockBackend::seeded().with_stored_plan(sample_plan()));
        let id = session(&backend);
        let mut orchestrator = AnalysisOrchestrator::new(Arc::clone(&backend), OrchestratorConfig::new());
        orchestrator.artifacts_mut().risks = std::iter::repeat(mm_test_utils::sample_risks())
            .take(4)
            .flatten()
            .collect();

        orchestrator.load_risks(&id).await.unwrap();
        orchestrator.load_risks(&id).await.unwrap();
        assert_eq!(orchestrator.artifacts().risks.len(), 1);

        orchestrator.load_plan(&id).await.unwrap();
        assert_eq!(orchestrator.artifacts().plan, Some(sample_plan()));
    }

    #[test]
    fn parses_backend_timestamps() {
        assert!(parse_timestamp("2026-10-01T08:00:00").is_some());
        assert!(parse_timestamp("2026-10-01T08:00:00.123456").is_some());
        assert!(parse_timestamp("2026-10-01T08:00:00Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn parses_timestamp_without_seconds() {
        let at = parse_timestamp("2026-10-01T08:00").unwrap();
        assert_eq!(at, parse_timestamp("2026-10-01T08:00:00Z").unwrap());
    }
}
