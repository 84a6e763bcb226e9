//! Request and response bodies exchanged with the backend

use mm_types::{
    ConnectionDescriptor, Relationship, Risk, RunId, SchemaCatalog, SessionId, TargetSummary,
    UserId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Connection test result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub collection_count: Option<usize>,
    #[serde(default)]
    pub collections: Vec<String>,
}

/// Get-or-create session request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub user_id: UserId,
    pub host: String,
    pub port: u16,
    pub database_name: String,
}

impl SessionRequest {
    /// Request for a user and a source connection
    #[must_use]
    pub fn new(user_id: UserId, connection: &ConnectionDescriptor) -> Self {
        Self {
            user_id,
            host: connection.host.clone(),
            port: connection.port,
            database_name: connection.database_name.clone(),
        }
    }
}

/// Get-or-create session response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(rename = "migrationId")]
    pub session_id: SessionId,
    #[serde(default)]
    pub is_existing: bool,
    #[serde(default)]
    pub has_analysis: bool,
    #[serde(default)]
    pub has_migration_plan: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analyzed_at: Option<String>,
}

/// Discovery request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub db_connection: ConnectionDescriptor,
    pub sample_size: u32,
    #[serde(rename = "includeAI")]
    pub include_ai: bool,
}

/// Discovery result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub schema_id: Option<String>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub collection_field_counts: BTreeMap<String, usize>,
    #[serde(default)]
    pub relationship_count: usize,
    #[serde(default)]
    pub risk_count: usize,
    #[serde(default)]
    pub error: Option<String>,
}

/// Discovered schema, fields grouped by collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResponse {
    #[serde(default)]
    pub schema_id: Option<String>,
    #[serde(default)]
    pub collections: SchemaCatalog,
}

/// Detected relationships
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipsResponse {
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// Detected risks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RisksResponse {
    #[serde(default)]
    pub risks: Vec<Risk>,
}

/// Session record; carries target host/port/database but never the password
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default)]
    pub id: Option<SessionId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub has_target_credentials: bool,
    #[serde(default)]
    pub target_host: Option<String>,
    #[serde(default)]
    pub target_port: Option<u16>,
    #[serde(default)]
    pub target_database: Option<String>,
}

impl SessionRecord {
    /// Configured target, when credentials were saved
    #[must_use]
    pub fn target_summary(&self) -> Option<TargetSummary> {
        if !self.has_target_credentials {
            return None;
        }
        Some(TargetSummary {
            host: self.target_host.clone().unwrap_or_default(),
            port: self.target_port.unwrap_or_default(),
            database_name: self.target_database.clone().unwrap_or_default(),
        })
    }
}

/// Run start acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub run_id: RunId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}
