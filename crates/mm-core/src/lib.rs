//! Migration Mind orchestration core
//!
//! The stateful part of a document-to-relational migration session:
//! - Probes a source connection and resolves its durable analysis session
//! - Triggers discovery and fans out the four artifact loads
//! - Gates plan generation on a loaded schema
//! - Runs the execution state machine and polls run progress until terminal
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mm_core::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(HttpBackend::new(&ClientConfig::default())?);
//! let mut workflow = MigrationWorkflow::new(backend, OrchestratorConfig::new(), Some(UserId::new("u1")));
//! workflow.apply_connection_string("mongodb://localhost:27017/shop")?;
//!
//! workflow.test_connection().await?;
//! let outcome = workflow.run_analysis().await?;
//! println!("{} collections", outcome.snapshot.collections.len());
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod execution;
pub mod plan;
pub mod probe;
pub mod session;
pub mod workflow;

pub use analysis::{
    AnalysisKind, AnalysisOrchestrator, AnalysisOutcome, AnalysisStatus, ArtifactKind, Artifacts,
    LoadReport,
};
pub use config::OrchestratorConfig;
pub use error::{MigrationError, MigrationResult};
pub use execution::{
    allowed_events, transition, validate_event, EventKind, ExecutionMonitor, MonitorEvent,
    MonitorState, PollTask, ProgressSnapshot,
};
pub use plan::PlanGenerator;
pub use probe::{ConnectionProbe, ProbeOutcome};
pub use session::{ResolvedSession, SessionResolver};
pub use workflow::{ConnectionCheck, MigrationWorkflow, EXISTING_ANALYSIS_MESSAGE};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a migration session
    pub use crate::{
        ExecutionMonitor, MigrationError, MigrationWorkflow, MonitorState, OrchestratorConfig,
    };
    pub use mm_client::{ClientConfig, HttpBackend, MigrationBackend};
    pub use mm_types::{ConnectionDescriptor, RunStatus, TargetCredentials, UserId};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
