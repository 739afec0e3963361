//! Error types for action execution.

use cad_clients::ClientError;

use super::action::ActionKind;

/// Why a single action attempt failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActionError {
    #[error("{kind} failed: {source}")]
    Client {
        kind: ActionKind,
        #[source]
        source: ClientError,
    },

    #[error("{kind} needs a cluster descriptor, but none was built")]
    MissingCluster { kind: ActionKind },

    #[error("{kind} was cancelled")]
    Cancelled { kind: ActionKind },

    #[error("{kind} worker panicked: {detail}")]
    Panicked { kind: ActionKind, detail: String },
}

impl ActionError {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionError::Client { kind, .. }
            | ActionError::MissingCluster { kind }
            | ActionError::Cancelled { kind }
            | ActionError::Panicked { kind, .. } => *kind,
        }
    }

    /// Only collaborator faults are worth another attempt.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ActionError::Client { .. })
    }
}

/// An action that exhausted its attempts.
#[derive(Debug, Clone)]
pub struct ActionFailure {
    /// Position in the submitted batch.
    pub index: usize,
    pub kind: ActionKind,
    pub attempts: u32,
    pub error: ActionError,
}

impl std::fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} {} after {} attempt(s): {}",
            self.index, self.kind, self.attempts, self.error
        )
    }
}

fn join_failures(failures: &[ActionFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors produced by the action executor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutorError {
    /// One or more actions failed. `skipped` counts actions that never ran
    /// because `stop_on_error` halted the batch.
    #[error("{} of {total} action(s) failed ({skipped} skipped): {}", .failures.len(), join_failures(.failures))]
    ActionsFailed {
        total: usize,
        skipped: usize,
        failures: Vec<ActionFailure>,
    },

    #[error("action batch cancelled with {pending} of {total} action(s) not run")]
    Cancelled { total: usize, pending: usize },
}

impl ExecutorError {
    pub fn failures(&self) -> &[ActionFailure] {
        match self {
            ExecutorError::ActionsFailed { failures, .. } => failures,
            ExecutorError::Cancelled { .. } => &[],
        }
    }
}

/// Result type for action execution.
pub type ExecutorResult<T> = std::result::Result<T, ExecutorError>;
