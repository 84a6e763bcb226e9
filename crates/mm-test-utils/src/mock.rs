//! In-memory stand-in for the backend service

use std::collections::{HashMap, VecDeque};

use mm_client::{
    AnalysisResponse, AnalyzeRequest, ClientError, ClientResult, ExecuteResponse,
    MigrationBackend, ProbeResponse, RelationshipsResponse, RisksResponse, SchemaResponse,
    SessionRecord, SessionRequest, SessionResponse,
};
use mm_types::{
    ConnectionDescriptor, MigrationPlan, Relationship, Risk, RunId, SchemaCatalog, SchemaField,
    SessionId, SessionKey, TableProgress, TargetCredentials, UserId,
};
use parking_lot::Mutex;

/// Backend endpoint, used to inspect calls and inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    TestConnection,
    Session,
    Analyze,
    Schema,
    Relationships,
    Risks,
    FetchPlan,
    GeneratePlan,
    FetchSession,
    SaveCredentials,
    Execute,
    Progress,
}

/// One recorded call: endpoint plus the session or run id it addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub endpoint: Endpoint,
    pub target: String,
}

#[derive(Debug, Default)]
struct SessionEntry {
    id: SessionId,
    has_analysis: bool,
    has_plan: bool,
    last_analyzed_at: Option<String>,
    target: Option<TargetCredentials>,
}

#[derive(Debug, Default)]
struct State {
    collections: Vec<String>,
    schema: SchemaCatalog,
    relationships: Vec<Relationship>,
    risks: Vec<Risk>,
    plan: Option<MigrationPlan>,
    generated_plan: MigrationPlan,
    sessions: HashMap<(UserId, String), SessionEntry>,
    session_seq: u64,
    run_seq: u64,
    progress: VecDeque<ClientResult<Vec<TableProgress>>>,
    failures: HashMap<Endpoint, ClientError>,
    calls: Vec<Call>,
    probed: Vec<ConnectionDescriptor>,
    analyze_requests: Vec<AnalyzeRequest>,
    saved_credentials: Vec<TargetCredentials>,
}

impl State {
    fn record(&mut self, endpoint: Endpoint, target: impl Into<String>) -> ClientResult<()> {
        self.calls.push(Call {
            endpoint,
            target: target.into(),
        });
        match self.failures.get(&endpoint) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn session_mut(&mut self, id: &SessionId) -> ClientResult<&mut SessionEntry> {
        self.sessions
            .values_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| ClientError::Status {
                status: 404,
                message: format!("Migration not found: {id}"),
            })
    }
}

/// Scriptable [`MigrationBackend`]
///
/// Sessions are upserted by user and connection fingerprint, the way the
/// real service keys them. Progress polls pop a scripted queue; the last
/// entry repeats once the queue is down to one.
#[derive(Debug, Default)]
pub struct MockBackend {
    state: Mutex<State>,
}

impl MockBackend {
    /// Empty backend: no collections, no artifacts
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend loaded with the sample data set from [`crate::fixtures`]
    #[must_use]
    pub fn seeded() -> Self {
        Self::new()
            .with_schema(crate::fixtures::sample_fields())
            .with_relationships(crate::fixtures::sample_relationships())
            .with_risks(crate::fixtures::sample_risks())
            .with_generated_plan(crate::fixtures::sample_plan())
    }

    /// Collections reported by the connection test
    #[must_use]
    pub fn with_collections<I, S>(self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().collections = collections.into_iter().map(Into::into).collect();
        self
    }

    /// Schema returned after analysis; also sets the probed collections
    #[must_use]
    pub fn with_schema(self, fields: Vec<SchemaField>) -> Self {
        {
            let mut state = self.state.lock();
            state.schema = fields.into_iter().collect();
            state.collections = state.schema.collections().map(str::to_string).collect();
        }
        self
    }

    #[must_use]
    pub fn with_relationships(self, relationships: Vec<Relationship>) -> Self {
        self.state.lock().relationships = relationships;
        self
    }

    #[must_use]
    pub fn with_risks(self, risks: Vec<Risk>) -> Self {
        self.state.lock().risks = risks;
        self
    }

    /// Plan produced by the generate endpoint
    #[must_use]
    pub fn with_generated_plan(self, plan: MigrationPlan) -> Self {
        self.state.lock().generated_plan = plan;
        self
    }

    /// Plan already stored server-side
    #[must_use]
    pub fn with_stored_plan(self, plan: MigrationPlan) -> Self {
        self.state.lock().plan = Some(plan);
        self
    }

    /// Create a session as if a previous visit had happened
    pub fn seed_session(&self, key: &SessionKey, has_analysis: bool) -> SessionId {
        let mut state = self.state.lock();
        state.session_seq += 1;
        let id = SessionId::new(format!("session-{}", state.session_seq));
        state.sessions.insert(
            (key.user_id.clone(), key.fingerprint()),
            SessionEntry {
                id: id.clone(),
                has_analysis,
                last_analyzed_at: has_analysis.then(|| "2026-10-01T08:00:00".to_string()),
                ..SessionEntry::default()
            },
        );
        id
    }

    /// Store target credentials on a session as if entered earlier
    pub fn configure_target(&self, session_id: &SessionId, credentials: TargetCredentials) {
        if let Ok(entry) = self.state.lock().session_mut(session_id) {
            entry.target = Some(credentials);
        }
    }

    /// Queue progress snapshots returned by successive polls
    pub fn script_progress<I>(&self, snapshots: I)
    where
        I: IntoIterator<Item = ClientResult<Vec<TableProgress>>>,
    {
        self.state.lock().progress.extend(snapshots);
    }

    /// Fail every call to `endpoint` until [`Self::recover`]
    pub fn fail(&self, endpoint: Endpoint, error: ClientError) {
        self.state.lock().failures.insert(endpoint, error);
    }

    /// Stop failing `endpoint`
    pub fn recover(&self, endpoint: Endpoint) {
        self.state.lock().failures.remove(&endpoint);
    }

    /// Every call in order
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Ids addressed by calls to `endpoint`, in order
    #[must_use]
    pub fn calls_for(&self, endpoint: Endpoint) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .map(|c| c.target.clone())
            .collect()
    }

    #[must_use]
    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }

    /// Total number of sessions created
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.state.lock().sessions.len()
    }

    /// Descriptors received by the connection test
    #[must_use]
    pub fn probed_connections(&self) -> Vec<ConnectionDescriptor> {
        self.state.lock().probed.clone()
    }

    /// Bodies received by the analyze endpoint
    #[must_use]
    pub fn analyze_requests(&self) -> Vec<AnalyzeRequest> {
        self.state.lock().analyze_requests.clone()
    }

    /// Credentials received by the save endpoint
    #[must_use]
    pub fn saved_credentials(&self) -> Vec<TargetCredentials> {
        self.state.lock().saved_credentials.clone()
    }
}

#[async_trait::async_trait]
impl MigrationBackend for MockBackend {
    async fn test_connection(
        &self,
        connection: &ConnectionDescriptor,
    ) -> ClientResult<ProbeResponse> {
        let mut state = self.state.lock();
        state.probed.push(connection.clone());
        state.record(Endpoint::TestConnection, connection.endpoint())?;
        Ok(ProbeResponse {
            success: true,
            message: Some("Connection successful".to_string()),
            error: None,
            collection_count: Some(state.collections.len()),
            collections: state.collections.clone(),
        })
    }

    async fn get_or_create_session(
        &self,
        request: &SessionRequest,
    ) -> ClientResult<SessionResponse> {
        let mut state = self.state.lock();
        state.record(Endpoint::Session, request.user_id.as_str())?;

        let key = SessionKey {
            user_id: request.user_id.clone(),
            host: request.host.clone(),
            port: request.port,
            database_name: request.database_name.clone(),
        };
        let slot = (key.user_id.clone(), key.fingerprint());
        let is_existing = state.sessions.contains_key(&slot);
        if !is_existing {
            state.session_seq += 1;
            let id = SessionId::new(format!("session-{}", state.session_seq));
            state.sessions.insert(
                slot.clone(),
                SessionEntry {
                    id,
                    ..SessionEntry::default()
                },
            );
        }
        let entry = &state.sessions[&slot];
        Ok(SessionResponse {
            session_id: entry.id.clone(),
            is_existing,
            has_analysis: entry.has_analysis,
            has_migration_plan: entry.has_plan,
            last_analyzed_at: entry.last_analyzed_at.clone(),
        })
    }

    async fn analyze(
        &self,
        session_id: &SessionId,
        request: &AnalyzeRequest,
    ) -> ClientResult<AnalysisResponse> {
        let mut state = self.state.lock();
        state.analyze_requests.push(request.clone());
        state.record(Endpoint::Analyze, session_id.as_str())?;

        let entry = state.session_mut(session_id)?;
        entry.has_analysis = true;
        entry.last_analyzed_at = Some(chrono::Utc::now().to_rfc3339());

        Ok(AnalysisResponse {
            success: true,
            message: Some("Analysis completed".to_string()),
            schema_id: Some(format!("schema-{session_id}")),
            collections: state.schema.collections().map(str::to_string).collect(),
            collection_field_counts: state
                .schema
                .0
                .iter()
                .map(|(name, fields)| (name.clone(), fields.len()))
                .collect(),
            relationship_count: state.relationships.len(),
            risk_count: state.risks.len(),
            error: None,
        })
    }

    async fn fetch_schema(&self, session_id: &SessionId) -> ClientResult<SchemaResponse> {
        let mut state = self.state.lock();
        state.record(Endpoint::Schema, session_id.as_str())?;
        Ok(SchemaResponse {
            schema_id: Some(format!("schema-{session_id}")),
            collections: state.schema.clone(),
        })
    }

    async fn fetch_relationships(
        &self,
        session_id: &SessionId,
    ) -> ClientResult<RelationshipsResponse> {
        let mut state = self.state.lock();
        state.record(Endpoint::Relationships, session_id.as_str())?;
        Ok(RelationshipsResponse {
            relationships: state.relationships.clone(),
        })
    }

    async fn fetch_risks(&self, session_id: &SessionId) -> ClientResult<RisksResponse> {
        let mut state = self.state.lock();
        state.record(Endpoint::Risks, session_id.as_str())?;
        Ok(RisksResponse {
            risks: state.risks.clone(),
        })
    }

    async fn fetch_plan(&self, session_id: &SessionId) -> ClientResult<MigrationPlan> {
        let mut state = self.state.lock();
        state.record(Endpoint::FetchPlan, session_id.as_str())?;
        state.plan.clone().ok_or_else(|| ClientError::Status {
            status: 404,
            message: "Migration plan not found".to_string(),
        })
    }

    async fn generate_plan(&self, session_id: &SessionId) -> ClientResult<MigrationPlan> {
        let mut state = self.state.lock();
        state.record(Endpoint::GeneratePlan, session_id.as_str())?;
        if state.schema.is_empty() {
            return Err(ClientError::Rejected(
                "Schema not found. Run analysis first.".to_string(),
            ));
        }
        state.session_mut(session_id)?.has_plan = true;
        let plan = state.generated_plan.clone();
        state.plan = Some(plan.clone());
        Ok(plan)
    }

    async fn fetch_session(&self, session_id: &SessionId) -> ClientResult<SessionRecord> {
        let mut state = self.state.lock();
        state.record(Endpoint::FetchSession, session_id.as_str())?;
        let entry = state.session_mut(session_id)?;
        let target = entry.target.as_ref();
        Ok(SessionRecord {
            id: Some(entry.id.clone()),
            name: None,
            status: Some("DRAFT".to_string()),
            has_target_credentials: target.is_some(),
            target_host: target.map(|t| t.host.clone()),
            target_port: target.map(|t| t.port),
            target_database: target.map(|t| t.database_name.clone()),
        })
    }

    async fn save_target_credentials(
        &self,
        session_id: &SessionId,
        credentials: &TargetCredentials,
    ) -> ClientResult<()> {
        let mut state = self.state.lock();
        state.saved_credentials.push(credentials.clone());
        state.record(Endpoint::SaveCredentials, session_id.as_str())?;
        state.session_mut(session_id)?.target = Some(credentials.clone());
        Ok(())
    }

    async fn execute(&self, session_id: &SessionId) -> ClientResult<ExecuteResponse> {
        let mut state = self.state.lock();
        state.record(Endpoint::Execute, session_id.as_str())?;
        if state.session_mut(session_id)?.target.is_none() {
            return Err(ClientError::Status {
                status: 400,
                message: "Target database credentials not configured".to_string(),
            });
        }
        state.run_seq += 1;
        Ok(ExecuteResponse {
            run_id: RunId::new(format!("r{}", state.run_seq)),
            status: Some("RUNNING".to_string()),
            message: Some("Migration started".to_string()),
            mode: Some("PARALLEL".to_string()),
        })
    }

    async fn fetch_progress(&self, run_id: &RunId) -> ClientResult<Vec<TableProgress>> {
        let mut state = self.state.lock();
        state.record(Endpoint::Progress, run_id.as_str())?;
        if state.progress.len() > 1 {
            return state.progress.pop_front().unwrap_or_else(|| Ok(Vec::new()));
        }
        state.progress.front().cloned().unwrap_or_else(|| Ok(Vec::new()))
    }
}
