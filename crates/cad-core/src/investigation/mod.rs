//! Investigation strategies and the checks that run before them.
//!
//! # Module layout
//!
//! - [`registry`]: `InvestigationRegistry`, ordered title matching
//! - [`precheck`]: cluster-state and fleet-support eligibility
//! - [`access_check`]: tenant cloud credential probe
//! - [`error`]: `InvestigationError`, the retry/abort classification

pub mod access_check;
pub mod error;
pub mod precheck;
pub mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::resources::ResourceBuilder;

pub use error::{BoxError, InvestigationError};
pub use registry::InvestigationRegistry;

/// A pluggable investigation for one kind of alert.
#[async_trait]
pub trait Investigation: Send + Sync {
    /// Stable identifier used in logs and notes.
    fn name(&self) -> &str;

    /// Substring of the alert title this investigation handles.
    fn alert_title(&self) -> &str;

    /// Experimental investigations only run when explicitly enabled.
    fn is_experimental(&self) -> bool {
        false
    }

    /// Whether a failed access check must halt this investigation.
    fn requires_cloud_access(&self) -> bool {
        false
    }

    async fn run(
        &self,
        builder: &mut ResourceBuilder,
    ) -> Result<InvestigationResult, InvestigationError>;
}

/// Why further investigation must not happen for this alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    #[error("cluster is uninstalling")]
    ClusterUninstalling,

    #[error("cloud provider {0} is not supported")]
    UnsupportedCloudProvider(String),

    #[error("cluster has access protection enabled")]
    AccessProtected,

    #[error("cloud credentials are missing")]
    CloudCredentialsMissing,

    #[error("cloud credentials could not be acquired: {0}")]
    CloudAccessUnavailable(String),
}

/// Marker for a noteworthy step an investigation performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMarker {
    pub name: String,
    pub performed: bool,
    pub labels: Vec<String>,
}

impl StepMarker {
    pub fn performed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            performed: true,
            labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }
}

/// What an investigation (or a precheck) wants done.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvestigationResult {
    /// Executed in this order unless the executor runs concurrently.
    pub actions: Vec<Action>,
    pub steps: Vec<StepMarker>,
    /// Set only for fatal, non-retriable preconditions.
    pub stop_investigations: Option<StopReason>,
}

impl InvestigationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_step(mut self, step: StepMarker) -> Self {
        self.steps.push(step);
        self
    }

    /// A result that halts the run after its actions are executed.
    pub fn stop(reason: StopReason, actions: Vec<Action>) -> Self {
        Self {
            actions,
            steps: Vec::new(),
            stop_investigations: Some(reason),
        }
    }

    pub fn is_stop(&self) -> bool {
        self.stop_investigations.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_style_result() {
        let result = InvestigationResult::new()
            .with_action(Action::note("checked"))
            .with_step(StepMarker::performed("egress_check").with_label("blocked"));
        assert_eq!(result.actions.len(), 1);
        assert_eq!(result.steps[0].labels, vec!["blocked".to_string()]);
        assert!(!result.is_stop());
    }

    #[test]
    fn test_stop_result_carries_reason() {
        let result = InvestigationResult::stop(StopReason::AccessProtected, vec![]);
        assert!(result.is_stop());
        assert_eq!(
            result.stop_investigations.unwrap().to_string(),
            "cluster has access protection enabled"
        );
    }
}
