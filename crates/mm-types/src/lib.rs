//! Migration Mind data model
//!
//! Plain data shared by the HTTP client and the orchestration core:
//! - Source/target connection descriptors and connection-string decomposition
//! - Discovered analysis artifacts (schema fields, relationships, risks)
//! - Migration plans, including normalization of the two plan wire shapes
//! - Target credentials and per-table run progress
//!
//! Nothing in this crate performs I/O.

#![allow(missing_docs)]

pub mod analysis;
pub mod connection;
pub mod execution;
pub mod ids;
pub mod plan;

pub use analysis::{AnalysisSnapshot, Relationship, Risk, SchemaCatalog, SchemaField, Severity};
pub use connection::{
    ConnectionDescriptor, ConnectionRole, ConnectionStringError, ParsedConnectionString,
    SessionKey,
};
pub use execution::{
    completion_percentage, CredentialField, RunStatus, RunSummary, TableProgress, TableStatus,
    TargetCredentials, TargetSummary,
};
pub use ids::{RunId, SessionId, UserId};
pub use plan::{
    ColumnMapping, ForeignKey, IndexRecommendation, MigrationPlan, MigrationStep, TableMapping,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
