//! Execution monitoring
//!
//! `Unconfigured -> Configured -> Running -> Terminal`, with `Configured ->
//! Unconfigured` when the operator changes the target. Transitions are
//! explicit: every state change goes through [`transition`].

mod monitor;
mod poller;

pub use monitor::ExecutionMonitor;
pub use poller::{PollTask, ProgressSnapshot};

use mm_types::RunId;
use serde::Serialize;

use crate::error::{MigrationError, MigrationResult};

/// Execution monitor state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorState {
    /// No target credentials known
    Unconfigured,
    /// Ready to migrate
    Configured,
    /// Run active, progress being polled
    Running { run_id: RunId },
    /// Every table reached COMPLETED or FAILED
    Terminal { run_id: RunId },
}

impl MonitorState {
    /// Lowercase name for messages
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Configured => "configured",
            Self::Running { .. } => "running",
            Self::Terminal { .. } => "terminal",
        }
    }

    /// Run of the current or finished migration
    #[must_use]
    pub fn run_id(&self) -> Option<&RunId> {
        match self {
            Self::Running { run_id } | Self::Terminal { run_id } => Some(run_id),
            Self::Unconfigured | Self::Configured => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Credentials were persisted
    CredentialsSaved,
    /// The session already had credentials
    AlreadyConfigured,
    /// The backend accepted a run
    RunStarted(RunId),
    /// Latest snapshot is terminal
    RunCompleted,
    /// Operator wants to enter a different target
    Reconfigure,
}

/// Event without payload, for guard checks before any call is made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CredentialsSaved,
    AlreadyConfigured,
    RunStarted,
    RunCompleted,
    Reconfigure,
}

impl EventKind {
    /// Operator-facing verb phrase
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::CredentialsSaved => "save target credentials",
            Self::AlreadyConfigured => "restore the saved target",
            Self::RunStarted => "start a run",
            Self::RunCompleted => "complete the run",
            Self::Reconfigure => "change the target database",
        }
    }
}

impl MonitorEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::CredentialsSaved => EventKind::CredentialsSaved,
            Self::AlreadyConfigured => EventKind::AlreadyConfigured,
            Self::RunStarted(_) => EventKind::RunStarted,
            Self::RunCompleted => EventKind::RunCompleted,
            Self::Reconfigure => EventKind::Reconfigure,
        }
    }
}

/// Events a state accepts
#[must_use]
pub fn allowed_events(from: &MonitorState) -> Vec<EventKind> {
    use EventKind::{AlreadyConfigured, CredentialsSaved, Reconfigure, RunCompleted, RunStarted};
    match from {
        MonitorState::Unconfigured => vec![CredentialsSaved, AlreadyConfigured],
        MonitorState::Configured => vec![RunStarted, Reconfigure],
        MonitorState::Running { .. } => vec![RunCompleted],
        MonitorState::Terminal { .. } => vec![],
    }
}

/// Check that `from` accepts `event`
///
/// # Errors
/// `IllegalTransition` when it does not.
pub fn validate_event(from: &MonitorState, event: EventKind) -> MigrationResult<()> {
    if allowed_events(from).contains(&event) {
        Ok(())
    } else {
        Err(MigrationError::IllegalTransition {
            from: from.name(),
            event: event.describe(),
        })
    }
}

/// Next state after `event`
///
/// # Errors
/// `IllegalTransition` when `from` does not accept `event`.
pub fn transition(from: &MonitorState, event: MonitorEvent) -> MigrationResult<MonitorState> {
    validate_event(from, event.kind())?;
    let next = match (from, event) {
        (_, MonitorEvent::CredentialsSaved | MonitorEvent::AlreadyConfigured) => {
            MonitorState::Configured
        }
        (_, MonitorEvent::RunStarted(run_id)) => MonitorState::Running { run_id },
        (MonitorState::Running { run_id }, MonitorEvent::RunCompleted) => MonitorState::Terminal {
            run_id: run_id.clone(),
        },
        (_, MonitorEvent::Reconfigure) => MonitorState::Unconfigured,
        (state, event) => {
            return Err(MigrationError::IllegalTransition {
                from: state.name(),
                event: event.kind().describe(),
            })
        }
    };
    Ok(next)
}
