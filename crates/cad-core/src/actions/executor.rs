//! Batch execution of actions: ordering, concurrency, retries, dry-run.
//!
//! The executor is the only place in a run where work happens concurrently.
//! With `concurrent` set, every action runs on its own Tokio task and all
//! tasks are joined before returning; otherwise actions run strictly in
//! submission order. Cancellation comes from the caller's token and is
//! observed between attempts and while a client call is in flight. A batch
//! halted by `stop_on_error` only keeps actions from starting or retrying;
//! calls already in flight run to completion.

use std::sync::Arc;
use std::time::Duration;

use cad_clients::{Clients, Cluster};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::action::{Action, ActionContext};
use super::error::{ActionError, ActionFailure, ExecutorError, ExecutorResult};
use crate::obs::emit_action_executed;
use crate::resources::NoteWriter;

/// How a batch is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorOptions {
    /// Log every action, call no client.
    pub dry_run: bool,
    /// Stop the batch at the first action that exhausts its retries.
    pub stop_on_error: bool,
    /// Retries per action (0 = run once).
    pub max_retries: u32,
    /// Run actions on independent tasks instead of in order.
    pub concurrent: bool,
    /// Base delay before a retry, doubled per attempt (milliseconds).
    pub retry_delay_ms: u64,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            stop_on_error: false,
            max_retries: 3,
            concurrent: false,
            retry_delay_ms: 250,
        }
    }
}

impl ExecutorOptions {
    fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.retry_delay_ms.saturating_mul(factor))
    }
}

/// One batch to execute.
#[derive(Debug, Clone, Default)]
pub struct ExecutionInput {
    pub actions: Vec<Action>,
    pub cluster: Option<Arc<Cluster>>,
    pub notes: Option<Arc<NoteWriter>>,
    pub options: ExecutorOptions,
}

enum Outcome {
    Done,
    Failed(ActionFailure),
    Skipped,
}

pub struct ActionExecutor {
    clients: Clients,
}

impl ActionExecutor {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    /// Execute `input.actions`. Failures of individual actions are collected
    /// into one [`ExecutorError::ActionsFailed`], ordered by submission index.
    #[instrument(skip_all, fields(actions = input.actions.len(), dry_run = input.options.dry_run))]
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        input: ExecutionInput,
    ) -> ExecutorResult<()> {
        let ExecutionInput {
            actions,
            cluster,
            notes,
            options,
        } = input;
        let total = actions.len();

        if options.dry_run {
            for action in &actions {
                info!(kind = %action.kind(), "dry run: not executing action");
                emit_action_executed(action.kind().as_str(), 0, true, true);
            }
            return Ok(());
        }

        let ctx = ActionContext { cluster, notes };
        // Cancelling `stop` halts the batch without cancelling the caller.
        let stop = cancel.child_token();

        let outcomes = if options.concurrent {
            self.execute_concurrent(actions, ctx, options, cancel, &stop)
                .await
        } else {
            self.execute_sequential(actions, ctx, options, cancel, &stop)
                .await
        };

        let mut failures = Vec::new();
        let mut skipped = 0;
        for outcome in outcomes {
            match outcome {
                Outcome::Done => {}
                Outcome::Failed(failure) => failures.push(failure),
                Outcome::Skipped => skipped += 1,
            }
        }
        failures.sort_by_key(|f| f.index);

        if !failures.is_empty() {
            return Err(ExecutorError::ActionsFailed {
                total,
                skipped,
                failures,
            });
        }
        if skipped > 0 {
            return Err(ExecutorError::Cancelled {
                total,
                pending: skipped,
            });
        }
        Ok(())
    }

    async fn execute_sequential(
        &self,
        actions: Vec<Action>,
        ctx: ActionContext,
        options: ExecutorOptions,
        cancel: &CancellationToken,
        stop: &CancellationToken,
    ) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(actions.len());
        for (index, action) in actions.iter().enumerate() {
            let outcome =
                run_action(index, action, &ctx, &self.clients, options, cancel, stop).await;
            if matches!(outcome, Outcome::Failed(_)) && options.stop_on_error {
                stop.cancel();
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn execute_concurrent(
        &self,
        actions: Vec<Action>,
        ctx: ActionContext,
        options: ExecutorOptions,
        cancel: &CancellationToken,
        stop: &CancellationToken,
    ) -> Vec<Outcome> {
        let mut tasks = Vec::with_capacity(actions.len());
        for (index, action) in actions.into_iter().enumerate() {
            let kind = action.kind();
            let ctx = ctx.clone();
            let clients = self.clients.clone();
            let cancel = cancel.clone();
            let stop = stop.clone();

            let task = tokio::spawn(async move {
                let outcome =
                    run_action(index, &action, &ctx, &clients, options, &cancel, &stop).await;
                if matches!(outcome, Outcome::Failed(_)) && options.stop_on_error {
                    stop.cancel();
                }
                outcome
            });
            tasks.push((index, kind, task));
        }

        // Join every task; a panicking worker still yields a failure.
        let mut outcomes = Vec::with_capacity(tasks.len());
        for (index, kind, task) in tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(join_err) => Outcome::Failed(ActionFailure {
                    index,
                    kind,
                    attempts: 1,
                    error: ActionError::Panicked {
                        kind,
                        detail: join_err.to_string(),
                    },
                }),
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

async fn run_action(
    index: usize,
    action: &Action,
    ctx: &ActionContext,
    clients: &Clients,
    options: ExecutorOptions,
    cancel: &CancellationToken,
    stop: &CancellationToken,
) -> Outcome {
    let kind = action.kind();
    let max_attempts = options.max_retries.saturating_add(1);

    if stop.is_cancelled() {
        info!(kind = %kind, index, "batch halted; action not run");
        return Outcome::Skipped;
    }

    let mut attempt = 0;
    loop {
        attempt += 1;

        // `stop` is a child of `cancel`; only the caller aborts an in-flight call.
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ActionError::Cancelled { kind }),
            result = action.execute(ctx, clients) => result,
        };

        let error = match result {
            Ok(()) => {
                emit_action_executed(kind.as_str(), attempt, false, true);
                return Outcome::Done;
            }
            Err(error) => error,
        };

        if attempt >= max_attempts || !error.is_retriable() {
            emit_action_executed(kind.as_str(), attempt, false, false);
            return Outcome::Failed(ActionFailure {
                index,
                kind,
                attempts: attempt,
                error,
            });
        }

        let delay = options.retry_delay(attempt);
        warn!(
            kind = %kind,
            attempt,
            max_attempts,
            error = %error,
            retry_in_ms = delay.as_millis() as u64,
            "action failed; retrying"
        );
        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                return Outcome::Failed(ActionFailure {
                    index,
                    kind,
                    attempts: attempt,
                    error,
                });
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
