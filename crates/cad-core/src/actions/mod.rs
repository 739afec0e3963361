//! Investigation result actions and their execution.
//!
//! - [`action`]: `Action`, `ActionKind`, `ActionContext`
//! - [`executor`]: `ActionExecutor`, `ExecutorOptions`, `ExecutionInput`
//! - [`error`]: `ActionError`, `ActionFailure`, `ExecutorError`

pub mod action;
pub mod error;
pub mod executor;

pub use action::{Action, ActionContext, ActionKind};
pub use error::{ActionError, ActionFailure, ExecutorError, ExecutorResult};
pub use executor::{ActionExecutor, ExecutionInput, ExecutorOptions};
