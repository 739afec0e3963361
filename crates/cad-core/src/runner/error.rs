//! Errors that end a run and trigger the fallback escalation.

use crate::actions::ExecutorError;
use crate::investigation::InvestigationError;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Investigation(#[from] InvestigationError),

    #[error("executing actions failed: {0}")]
    Actions(#[from] ExecutorError),

    #[error("investigation run was cancelled")]
    Cancelled,
}

impl RunError {
    /// Short label for logs and run reports.
    pub fn class(&self) -> &'static str {
        match self {
            RunError::Investigation(err) => err.class(),
            RunError::Actions(_) => "actions",
            RunError::Cancelled => "cancelled",
        }
    }
}
