//! Migration Mind backend boundary
//!
//! Everything the orchestration core knows about the backend service:
//! - Wire request/response types for every endpoint
//! - The [`MigrationBackend`] trait the core is written against
//! - [`HttpBackend`], the reqwest implementation used in production
//!
//! Non-2xx responses and malformed bodies become [`ClientError`] values;
//! nothing here panics on bad input from the server.

#![allow(missing_docs)]

pub mod backend;
pub mod error;
pub mod http;
pub mod wire;

pub use backend::MigrationBackend;
pub use error::ClientError;
pub use http::{ClientConfig, HttpBackend};
pub use wire::{
    AnalysisResponse, AnalyzeRequest, ExecuteResponse, ProbeResponse, RelationshipsResponse,
    RisksResponse, SchemaResponse, SessionRecord, SessionRequest, SessionResponse,
};

/// Result alias for backend calls
pub type ClientResult<T> = Result<T, ClientError>;
