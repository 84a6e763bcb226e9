//! Error types for the orchestration core
//!
//! Mirrors the failure taxonomy operators see:
//! - Transport failures from the backend (never retried automatically)
//! - Local validation failures, raised before any network call
//! - Business failures reported by the backend, surfaced verbatim
//! - Precondition and state-machine guard violations

use mm_client::ClientError;

/// Main orchestration error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// Backend call failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Input rejected locally
    #[error("validation failed: {0}")]
    Validation(String),

    /// No authenticated user to own the session
    #[error("no authenticated user")]
    NotAuthenticated,

    /// Operation needs a resolved session
    #[error("no analysis session; test the connection first")]
    MissingSession,

    /// Plan generation needs a loaded schema
    #[error("no schema collections loaded for this session")]
    PlanPrerequisite,

    /// Execution state machine refused an event
    #[error("cannot {event} while {from}")]
    IllegalTransition {
        /// State the monitor was in
        from: &'static str,
        /// Event that was refused
        event: &'static str,
    },
}

impl MigrationError {
    /// Transport failures are worth retrying as-is
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Client(ClientError::Network(_)))
    }

    /// Message to show the operator
    #[must_use]
    pub fn operator_message(&self) -> String {
        match self {
            Self::Client(ClientError::Network(_)) => {
                "Network error: the backend could not be reached".to_string()
            }
            Self::Client(ClientError::Malformed(_)) => {
                "Unexpected response from the backend".to_string()
            }
            Self::Client(err) => err
                .server_message()
                .map_or_else(|| err.to_string(), str::to_string),
            Self::Validation(message) => message.clone(),
            Self::NotAuthenticated => "Sign in before analyzing a database".to_string(),
            Self::MissingSession => {
                "Test the connection first to open an analysis session".to_string()
            }
            Self::PlanPrerequisite => "Run the analysis before generating a plan".to_string(),
            Self::IllegalTransition { .. } => self.to_string(),
        }
    }
}

/// Result alias for orchestration operations
pub type MigrationResult<T> = Result<T, MigrationError>;
