//! End-to-end handling of one alert.
//!
//! ```text
//! Start → Match → Precheck → AccessCheck → Investigate (retry) → ExecuteActions → Cleanup → End
//! ```
//!
//! Every stage after Match runs against one [`ResourceBuilder`]. Cleanup
//! releases the builder's grants on every path out of those stages, after
//! which a failed run is handed to [`failure::handle_failure`].

pub mod error;
pub mod failure;
pub mod retry;

use std::time::Instant;

use cad_clients::Clients;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::actions::{Action, ActionExecutor, ActionKind, ExecutionInput, ExecutorResult};
use crate::config::CadConfig;
use crate::investigation::access_check::access_check;
use crate::investigation::precheck::precheck;
use crate::investigation::{
    Investigation, InvestigationRegistry, InvestigationResult, StopReason,
};
use crate::obs::{emit_attempt_failed, emit_run_finished, emit_run_started, InvestigationSpan};
use crate::resources::ResourceBuilder;

pub use error::RunError;
pub use retry::RetryPolicy;

/// Stage that stopped a run early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Precheck,
    AccessCheck,
    Investigate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The investigation ran and its actions were executed.
    Completed,
    /// A check decided the alert needs no further investigation.
    Stopped { stage: Stage, reason: StopReason },
    /// No registered investigation handles this alert; it was escalated.
    NoMatchingInvestigation,
    /// The run failed and the fallback escalation was attempted.
    Failed {
        error: String,
        fallback_delivered: bool,
    },
}

impl RunOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Stopped { .. } => "stopped",
            RunOutcome::NoMatchingInvestigation => "no_matching_investigation",
            RunOutcome::Failed { .. } => "failed",
        }
    }
}

/// Summary of one run, for callers and tests.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub alert_title: String,
    pub cluster_id: String,
    pub investigation: Option<String>,
    pub outcome: RunOutcome,
    /// Investigation attempts made (0 if the run never reached Investigate).
    pub attempts: u32,
    /// Grants whose release ran during cleanup.
    pub released_grants: usize,
}

pub struct InvestigationRunner {
    clients: Clients,
    registry: InvestigationRegistry,
    config: CadConfig,
    executor: ActionExecutor,
}

impl InvestigationRunner {
    pub fn new(clients: Clients, registry: InvestigationRegistry, config: CadConfig) -> Self {
        let executor = ActionExecutor::new(clients.clone());
        Self {
            clients,
            registry,
            config,
            executor,
        }
    }

    pub fn config(&self) -> &CadConfig {
        &self.config
    }

    /// Investigate the alert the alerting client is bound to.
    pub async fn run(&self, cancel: &CancellationToken) -> RunReport {
        let alert_title = self.clients.alerting.alert_title();
        let span = InvestigationSpan::new(&alert_title);
        let started = Instant::now();

        let report = self
            .run_in_span(cancel, alert_title, &span)
            .instrument(span.span())
            .await;

        span.span().in_scope(|| {
            emit_run_finished(
                report.outcome.label(),
                report.attempts,
                report.released_grants,
                started.elapsed().as_millis() as u64,
            )
        });
        report
    }

    async fn run_in_span(
        &self,
        cancel: &CancellationToken,
        alert_title: String,
        span: &InvestigationSpan,
    ) -> RunReport {
        let cluster_id = self.clients.alerting.cluster_reference();
        span.record_cluster(&cluster_id);

        let mut report = RunReport {
            run_id: span.run_id(),
            alert_title,
            cluster_id,
            investigation: None,
            outcome: RunOutcome::NoMatchingInvestigation,
            attempts: 0,
            released_grants: 0,
        };

        let Some(investigation) = self.registry.find(
            &report.alert_title,
            self.config.investigations.experimental_enabled,
        ) else {
            self.escalate_unmatched(cancel, &report.alert_title).await;
            return report;
        };

        span.record_investigation(investigation.name());
        report.investigation = Some(investigation.name().to_string());
        emit_run_started(investigation.name(), &report.cluster_id);

        let mut builder = ResourceBuilder::new(
            report.cluster_id.clone(),
            investigation.name(),
            self.clients.clone(),
            self.config.access.api_scope.clone(),
        );

        let result = self
            .drive(cancel, &mut builder, investigation.as_ref(), &mut report.attempts)
            .await;

        report.released_grants = builder.release_all().await;

        report.outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(class = err.class(), error = %err, "investigation run failed");
                let fallback_delivered = failure::handle_failure(
                    self.clients.alerting.as_ref(),
                    investigation.name(),
                    &err,
                    builder.resources().notes.clone(),
                    self.config.executor.dry_run,
                )
                .await;
                RunOutcome::Failed {
                    error: err.to_string(),
                    fallback_delivered,
                }
            }
        };
        report
    }

    /// Precheck, access check, investigation and action execution.
    async fn drive(
        &self,
        cancel: &CancellationToken,
        builder: &mut ResourceBuilder,
        investigation: &dyn Investigation,
        attempts: &mut u32,
    ) -> Result<RunOutcome, RunError> {
        let checked = precheck(builder, &self.config.access.supported_cloud_providers).await?;
        if let Some(cluster) = &builder.resources().cluster {
            info!(cluster_uuid = %cluster.id, "cluster resolved");
        }
        if let Some(reason) = checked.stop_investigations {
            self.execute_actions(cancel, builder, checked.actions).await?;
            return Ok(RunOutcome::Stopped {
                stage: Stage::Precheck,
                reason,
            });
        }

        let access = access_check(builder).await?;
        if let Some(reason) = access.stop_investigations {
            if investigation.requires_cloud_access() {
                self.execute_actions(cancel, builder, access.actions).await?;
                return Ok(RunOutcome::Stopped {
                    stage: Stage::AccessCheck,
                    reason,
                });
            }
            // Record what the check found, but leave the alert state to the
            // investigation that keeps running.
            let findings: Vec<Action> = access
                .actions
                .into_iter()
                .filter(|action| {
                    !matches!(action.kind(), ActionKind::Escalate | ActionKind::Silence)
                })
                .collect();
            self.execute_actions(cancel, builder, findings).await?;
            builder.clear_failure();
            if let Some(notes) = &builder.resources().notes {
                notes.append_warning(format!(
                    "Cloud access check failed ({reason}); continuing without cloud access"
                ));
            }
            info!(%reason, "cloud access unavailable; investigation does not require it");
        }

        let result = self.investigate(cancel, builder, investigation, attempts).await?;
        log_steps(&result);

        let stop = result.stop_investigations.clone();
        self.execute_actions(cancel, builder, result.actions).await?;

        Ok(match stop {
            Some(reason) => RunOutcome::Stopped {
                stage: Stage::Investigate,
                reason,
            },
            None => RunOutcome::Completed,
        })
    }

    /// Run the investigation, retrying infrastructure errors with backoff.
    async fn investigate(
        &self,
        cancel: &CancellationToken,
        builder: &mut ResourceBuilder,
        investigation: &dyn Investigation,
        attempts: &mut u32,
    ) -> Result<InvestigationResult, RunError> {
        let policy = self.config.retry;
        let max_attempts = policy.attempts();

        let mut attempt = 0;
        loop {
            attempt += 1;
            *attempts = attempt;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RunError::Cancelled),
                outcome = investigation.run(&mut *builder) => outcome,
            };

            let err = match outcome {
                Ok(result) => return Ok(result),
                Err(err) => err,
            };

            if !err.is_infrastructure() || attempt >= max_attempts {
                emit_attempt_failed(attempt, max_attempts, &err, None);
                return Err(err.into());
            }

            let delay = policy.backoff(attempt);
            emit_attempt_failed(attempt, max_attempts, &err, Some(delay));
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RunError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn execute_actions(
        &self,
        cancel: &CancellationToken,
        builder: &ResourceBuilder,
        actions: Vec<Action>,
    ) -> ExecutorResult<()> {
        if actions.is_empty() {
            return Ok(());
        }
        let resources = builder.resources();
        let input = ExecutionInput {
            actions,
            cluster: resources.cluster.clone(),
            notes: resources.notes.clone(),
            options: self.config.executor,
        };
        self.executor.execute(cancel, input).await
    }

    async fn escalate_unmatched(&self, cancel: &CancellationToken, alert_title: &str) {
        info!("no investigation registered for alert; escalating");
        let input = ExecutionInput {
            actions: vec![Action::escalate(format!(
                "No automated investigation available for alert '{alert_title}'. Manual investigation required."
            ))],
            options: self.config.executor,
            ..ExecutionInput::default()
        };
        if let Err(err) = self.executor.execute(cancel, input).await {
            warn!(error = %err, "failed to escalate unmatched alert");
        }
    }
}

impl std::fmt::Debug for InvestigationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvestigationRunner")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn log_steps(result: &InvestigationResult) {
    for step in &result.steps {
        info!(
            step = %step.name,
            performed = step.performed,
            labels = ?step.labels,
            "investigation step"
        );
    }
}
