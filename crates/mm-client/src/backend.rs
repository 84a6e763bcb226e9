//! The seam between the orchestration core and the backend service

use mm_types::{
    ConnectionDescriptor, MigrationPlan, RunId, SessionId, TableProgress, TargetCredentials,
};

use crate::wire::{
    AnalysisResponse, AnalyzeRequest, ExecuteResponse, ProbeResponse, RelationshipsResponse,
    RisksResponse, SchemaResponse, SessionRecord, SessionRequest, SessionResponse,
};
use crate::ClientResult;

/// Backend operations consumed by the core
///
/// Implementations must turn every failure (transport, status, body) into a
/// [`crate::ClientError`]; callers never see a panic from a bad response.
#[async_trait::async_trait]
pub trait MigrationBackend: Send + Sync {
    /// `POST /api/mongo/connections/test`
    async fn test_connection(&self, connection: &ConnectionDescriptor)
        -> ClientResult<ProbeResponse>;

    /// `POST /api/mongo/get-or-create-migration`
    async fn get_or_create_session(&self, request: &SessionRequest)
        -> ClientResult<SessionResponse>;

    /// `POST /api/mongo/analyze/{sessionId}`
    async fn analyze(
        &self,
        session_id: &SessionId,
        request: &AnalyzeRequest,
    ) -> ClientResult<AnalysisResponse>;

    /// `GET /api/mongo/schema/{sessionId}`
    async fn fetch_schema(&self, session_id: &SessionId) -> ClientResult<SchemaResponse>;

    /// `GET /api/mongo/relationships/{sessionId}`
    async fn fetch_relationships(&self, session_id: &SessionId)
        -> ClientResult<RelationshipsResponse>;

    /// `GET /api/mongo/risks/{sessionId}`
    async fn fetch_risks(&self, session_id: &SessionId) -> ClientResult<RisksResponse>;

    /// `GET /api/mongo/migration-plan/{sessionId}`, normalized from either wire shape
    async fn fetch_plan(&self, session_id: &SessionId) -> ClientResult<MigrationPlan>;

    /// `POST /api/mongo/migration-plan/generate/{sessionId}`
    async fn generate_plan(&self, session_id: &SessionId) -> ClientResult<MigrationPlan>;

    /// `GET /api/migrations/{sessionId}`
    async fn fetch_session(&self, session_id: &SessionId) -> ClientResult<SessionRecord>;

    /// `PUT /api/migrations/{sessionId}/target-credentials`
    async fn save_target_credentials(
        &self,
        session_id: &SessionId,
        credentials: &TargetCredentials,
    ) -> ClientResult<()>;

    /// `POST /api/migrations/{sessionId}/execute`
    async fn execute(&self, session_id: &SessionId) -> ClientResult<ExecuteResponse>;

    /// `GET /api/migrations/run/{runId}/progress`
    async fn fetch_progress(&self, run_id: &RunId) -> ClientResult<Vec<TableProgress>>;
}
