//! CAD Core Library
//!
//! Resource lifecycle and investigation orchestration for cluster alerts:
//! build scoped access lazily, run the matching investigation with retry,
//! execute its actions, and always release what was acquired.

pub mod actions;
pub mod config;
pub mod investigation;
pub mod obs;
pub mod resources;
pub mod runner;
pub mod telemetry;

pub use actions::{
    Action, ActionContext, ActionError, ActionExecutor, ActionFailure, ActionKind, ExecutionInput,
    ExecutorError, ExecutorOptions, ExecutorResult,
};
pub use config::{
    AccessConfig, CadConfig, ConfigError, ConfigResult, InvestigationsConfig, LoggingConfig,
};
pub use investigation::{
    Investigation, InvestigationError, InvestigationRegistry, InvestigationResult, StepMarker,
    StopReason,
};
pub use resources::{
    BuildRequest, Capability, ManagementResources, NoteLevel, NoteWriter, ResourceBuilder,
    ResourceError, ResourceResult, Resources, ScopedGrant,
};
pub use runner::{InvestigationRunner, RetryPolicy, RunError, RunOutcome, RunReport, Stage};

pub use obs::{
    emit_action_executed, emit_attempt_failed, emit_release_failed, emit_run_finished,
    emit_run_started, InvestigationSpan,
};
pub use telemetry::init_tracing;

/// CAD version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
