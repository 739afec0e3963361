//! Top-level failure handling: the alert must end up with a human.

use std::sync::Arc;

use cad_clients::AlertingClient;
use tracing::{error, info};

use super::error::RunError;
use crate::actions::ActionContext;
use crate::investigation::InvestigationError;
use crate::resources::NoteWriter;

/// Escalation text for a failed run.
pub fn failure_message(investigation: &str, err: &RunError) -> String {
    match err {
        RunError::Investigation(InvestigationError::DocumentationMismatch(detail)) => format!(
            "The alert does not match this cluster's topology: {detail}. \
             The alert routing or its documentation needs review; manual investigation required."
        ),
        _ => format!(
            "Automated investigation '{investigation}' failed: {err}. Manual investigation required."
        ),
    }
}

/// Escalate the alert with a note describing `err`, plus any notes the run
/// collected. Returns whether the escalation was delivered; a delivery
/// failure is logged and nothing else.
pub async fn handle_failure(
    alerting: &dyn AlertingClient,
    investigation: &str,
    err: &RunError,
    notes: Option<Arc<NoteWriter>>,
    dry_run: bool,
) -> bool {
    let ctx = ActionContext {
        cluster: None,
        notes,
    };
    let message = ctx.compose(&failure_message(investigation, err));

    if dry_run {
        info!(class = err.class(), "dry run: not delivering fallback escalation");
        return false;
    }

    match alerting.escalate_with_note(&message).await {
        Ok(()) => true,
        Err(delivery) => {
            error!(
                class = err.class(),
                error = %err,
                delivery_error = %delivery,
                "failed to deliver fallback escalation"
            );
            false
        }
    }
}
