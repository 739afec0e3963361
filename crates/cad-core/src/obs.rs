//! Structured observability hooks for investigation runs.
//!
//! This module provides:
//! - A per-alert [`InvestigationSpan`] that every log line of a run is recorded in
//! - Emission functions for key lifecycle events: start, failed attempt,
//!   executed action, failed release, finish
//!
//! The span is created once per alert and passed down explicitly, so the
//! cluster id can be attached as soon as it is known without touching any
//! global logger state.

use std::time::Duration;

use tracing::field::Empty;
use tracing::{info, warn, Span};
use uuid::Uuid;

/// Span handle that scopes all logging of one alert's investigation.
///
/// # Example
///
/// ```ignore
/// let span = InvestigationSpan::new("KubeAPIErrorBudgetBurn");
/// span.record_cluster("2a6kv0e6q0l9n1h2");
/// run.instrument(span.span()).await;
/// ```
#[derive(Debug, Clone)]
pub struct InvestigationSpan {
    run_id: Uuid,
    span: Span,
}

impl InvestigationSpan {
    pub fn new(alert_title: &str) -> Self {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "cad.investigation",
            run_id = %run_id,
            alert = %alert_title,
            cluster_id = Empty,
            investigation = Empty,
        );
        Self { run_id, span }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn record_cluster(&self, cluster_id: &str) {
        self.span.record("cluster_id", cluster_id);
    }

    pub fn record_investigation(&self, name: &str) {
        self.span.record("investigation", name);
    }

    pub fn span(&self) -> Span {
        self.span.clone()
    }
}

/// Emit event: investigation selected and about to start.
pub fn emit_run_started(investigation: &str, cluster_id: &str) {
    info!(event = "run.started", investigation = %investigation, cluster_id = %cluster_id);
}

/// Emit event: an investigation attempt failed. `retry_in` is `None` when no
/// further attempt will be made.
pub fn emit_attempt_failed(
    attempt: u32,
    max_attempts: u32,
    error: &dyn std::fmt::Display,
    retry_in: Option<Duration>,
) {
    warn!(
        event = "run.attempt_failed",
        attempt = attempt,
        max_attempts = max_attempts,
        error = %error,
        retry_in_ms = retry_in.map(|d| d.as_millis() as u64),
    );
}

/// Emit event: one action finished executing.
pub fn emit_action_executed(kind: &str, attempts: u32, dry_run: bool, success: bool) {
    info!(
        event = "action.executed",
        kind = %kind,
        attempts = attempts,
        dry_run = dry_run,
        success = success,
    );
}

/// Emit event: releasing an ephemeral grant failed (warning level).
pub fn emit_release_failed(grant: &str, error: &dyn std::fmt::Display) {
    warn!(event = "access.release_failed", grant = %grant, error = %error);
}

/// Emit event: run finished with its outcome label.
pub fn emit_run_finished(outcome: &str, attempts: u32, released_grants: usize, duration_ms: u64) {
    info!(
        event = "run.finished",
        outcome = %outcome,
        attempts = attempts,
        released_grants = released_grants,
        duration_ms = duration_ms,
    );
}
