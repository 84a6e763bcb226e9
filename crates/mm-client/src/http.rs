//! reqwest transport for [`MigrationBackend`]

use std::time::Duration;

use mm_types::{
    ConnectionDescriptor, MigrationPlan, RunId, SessionId, TableProgress, TargetCredentials,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::MigrationBackend;
use crate::error::ClientError;
use crate::wire::{
    AnalysisResponse, AnalyzeRequest, ExecuteResponse, ProbeResponse, RelationshipsResponse,
    RisksResponse, SchemaResponse, SessionRecord, SessionRequest, SessionResponse,
};
use crate::ClientResult;

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the backend service
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Request timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
        }
    }
}

/// HTTP implementation of the backend boundary. No retries: every failure
/// is returned to the caller, who decides whether the operator retries.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Build the transport
    ///
    /// # Errors
    /// `ClientError::Network` if the underlying client cannot be constructed.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("migration-mind/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(network)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn call_value(&self, request: RequestBuilder) -> ClientResult<Value> {
        let response = request.send().await.map_err(network)?;
        let status = response.status();
        let body = response.text().await.map_err(network)?;
        interpret(status, &body)
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> ClientResult<T> {
        let value = self.call_value(request).await?;
        serde_json::from_value(value).map_err(|e| ClientError::Malformed(format!("{what}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, what: &str) -> ClientResult<T> {
        let url = self.url(path);
        tracing::debug!("GET {url}");
        self.call(self.client.get(&url), what).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
        what: &str,
    ) -> ClientResult<T> {
        let url = self.url(path);
        tracing::debug!("POST {url}");
        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.call(request, what).await
    }

    async fn plan_from(&self, request: RequestBuilder) -> ClientResult<MigrationPlan> {
        let payload = self.call_value(request).await?;
        MigrationPlan::from_payload(payload)
            .map_err(|e| ClientError::Malformed(format!("migration plan: {e}")))
    }
}

fn network(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Network(format!("request timed out: {err}"))
    } else {
        ClientError::Network(err.to_string())
    }
}

/// Map a raw response onto a JSON value or a [`ClientError`]
fn interpret(status: StatusCode, body: &str) -> ClientResult<Value> {
    let parsed = if body.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str::<Value>(body)
    };

    if !status.is_success() {
        let message = parsed
            .ok()
            .as_ref()
            .and_then(embedded_message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }

    let value = parsed.map_err(|e| ClientError::Malformed(e.to_string()))?;
    if let Some(message) = embedded_failure(&value) {
        return Err(ClientError::Rejected(message));
    }
    Ok(value)
}

fn embedded_message(value: &Value) -> Option<String> {
    value
        .get("error")
        .and_then(Value::as_str)
        .or_else(|| value.get("message").and_then(Value::as_str))
        .map(str::to_string)
}

fn embedded_failure(value: &Value) -> Option<String> {
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Some(error.to_string());
    }
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        return Some(embedded_message(value).unwrap_or_else(|| "request failed".to_string()));
    }
    None
}

#[async_trait::async_trait]
impl MigrationBackend for HttpBackend {
    async fn test_connection(
        &self,
        connection: &ConnectionDescriptor,
    ) -> ClientResult<ProbeResponse> {
        self.post("/api/mongo/connections/test", Some(connection), "connection test")
            .await
    }

    async fn get_or_create_session(
        &self,
        request: &SessionRequest,
    ) -> ClientResult<SessionResponse> {
        self.post("/api/mongo/get-or-create-migration", Some(request), "session")
            .await
    }

    async fn analyze(
        &self,
        session_id: &SessionId,
        request: &AnalyzeRequest,
    ) -> ClientResult<AnalysisResponse> {
        self.post(&format!("/api/mongo/analyze/{session_id}"), Some(request), "analysis")
            .await
    }

    async fn fetch_schema(&self, session_id: &SessionId) -> ClientResult<SchemaResponse> {
        self.get(&format!("/api/mongo/schema/{session_id}"), "schema").await
    }

    async fn fetch_relationships(
        &self,
        session_id: &SessionId,
    ) -> ClientResult<RelationshipsResponse> {
        self.get(&format!("/api/mongo/relationships/{session_id}"), "relationships")
            .await
    }

    async fn fetch_risks(&self, session_id: &SessionId) -> ClientResult<RisksResponse> {
        self.get(&format!("/api/mongo/risks/{session_id}"), "risks").await
    }

    async fn fetch_plan(&self, session_id: &SessionId) -> ClientResult<MigrationPlan> {
        let url = self.url(&format!("/api/mongo/migration-plan/{session_id}"));
        tracing::debug!("GET {url}");
        self.plan_from(self.client.get(&url)).await
    }

    async fn generate_plan(&self, session_id: &SessionId) -> ClientResult<MigrationPlan> {
        let url = self.url(&format!("/api/mongo/migration-plan/generate/{session_id}"));
        tracing::debug!("POST {url}");
        self.plan_from(self.client.post(&url)).await
    }

    async fn fetch_session(&self, session_id: &SessionId) -> ClientResult<SessionRecord> {
        self.get(&format!("/api/migrations/{session_id}"), "session record")
            .await
    }

    async fn save_target_credentials(
        &self,
        session_id: &SessionId,
        credentials: &TargetCredentials,
    ) -> ClientResult<()> {
        let url = self.url(&format!("/api/migrations/{session_id}/target-credentials"));
        tracing::debug!("PUT {url}");
        self.call_value(self.client.put(&url).json(credentials))
            .await
            .map(|_| ())
    }

    async fn execute(&self, session_id: &SessionId) -> ClientResult<ExecuteResponse> {
        self.post::<(), _>(&format!("/api/migrations/{session_id}/execute"), None, "run start")
            .await
    }

    async fn fetch_progress(&self, run_id: &RunId) -> ClientResult<Vec<TableProgress>> {
        self.get(&format!("/api/migrations/run/{run_id}/progress"), "run progress")
            .await
    }
}
