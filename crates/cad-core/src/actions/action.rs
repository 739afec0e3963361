//! The closed set of side effects an investigation can request.

use std::sync::Arc;

use cad_clients::{Clients, Cluster, LimitedSupportReason, Report, ServiceLog};
use serde::{Deserialize, Serialize};

use super::error::ActionError;
use crate::resources::NoteWriter;

/// Type tag for an [`Action`], disjoint per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Note,
    Escalate,
    Silence,
    Report,
    ServiceLog,
    LimitedSupport,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Note => "note",
            ActionKind::Escalate => "escalate",
            ActionKind::Silence => "silence",
            ActionKind::Report => "report",
            ActionKind::ServiceLog => "service_log",
            ActionKind::LimitedSupport => "limited_support",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested side effect. Actions are plain data; nothing happens until
/// the executor runs them. Every variant must be safe to repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Attach `text` to the alert verbatim.
    Note { text: String },
    /// Hand the alert to a human. The run's notes are appended to `reason`.
    Escalate { reason: String },
    /// Silence the alert. The run's notes are appended to `reason`.
    Silence { reason: String },
    Report { report: Report },
    ServiceLog { log: ServiceLog },
    LimitedSupport { reason: LimitedSupportReason },
}

impl Action {
    pub fn note(text: impl Into<String>) -> Self {
        Action::Note { text: text.into() }
    }

    pub fn escalate(reason: impl Into<String>) -> Self {
        Action::Escalate {
            reason: reason.into(),
        }
    }

    pub fn silence(reason: impl Into<String>) -> Self {
        Action::Silence {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Note { .. } => ActionKind::Note,
            Action::Escalate { .. } => ActionKind::Escalate,
            Action::Silence { .. } => ActionKind::Silence,
            Action::Report { .. } => ActionKind::Report,
            Action::ServiceLog { .. } => ActionKind::ServiceLog,
            Action::LimitedSupport { .. } => ActionKind::LimitedSupport,
        }
    }

    /// Perform the side effect once.
    pub async fn execute(&self, ctx: &ActionContext, clients: &Clients) -> Result<(), ActionError> {
        let kind = self.kind();
        let delivered = match self {
            Action::Note { text } => clients.alerting.add_note(text).await,
            Action::Escalate { reason } => {
                clients
                    .alerting
                    .escalate_with_note(&ctx.compose(reason))
                    .await
            }
            Action::Silence { reason } => {
                clients
                    .alerting
                    .silence_with_note(&ctx.compose(reason))
                    .await
            }
            Action::Report { report } => {
                let cluster = ctx.require_cluster(kind)?;
                clients.reports.create_report(&cluster.id, report).await
            }
            Action::ServiceLog { log } => {
                let cluster = ctx.require_cluster(kind)?;
                clients.inventory.post_service_log(&cluster.id, log).await
            }
            Action::LimitedSupport { reason } => {
                let cluster = ctx.require_cluster(kind)?;
                clients
                    .inventory
                    .post_limited_support_reason(&cluster.id, reason)
                    .await
            }
        };
        delivered.map_err(|source| ActionError::Client { kind, source })
    }
}

/// Read-only run state an action may use while executing.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    pub cluster: Option<Arc<Cluster>>,
    pub notes: Option<Arc<NoteWriter>>,
}

impl ActionContext {
    fn require_cluster(&self, kind: ActionKind) -> Result<&Cluster, ActionError> {
        self.cluster
            .as_deref()
            .ok_or(ActionError::MissingCluster { kind })
    }

    /// `reason`, followed by the rendered notes when there are any.
    pub fn compose(&self, reason: &str) -> String {
        match &self.notes {
            Some(notes) if !notes.is_empty() => format!("{reason}\n\n{}", notes.render()),
            _ => reason.to_string(),
        }
    }
}
