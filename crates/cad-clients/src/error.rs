//! Error types for capability clients

use thiserror::Error;

/// Errors a capability client can report back to the core.
///
/// The variants are deliberately coarse: the core only needs to tell a
/// transient backend fault apart from a conclusive answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The requested object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend could not be reached or answered with a transient fault
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Tenant cloud credentials are structurally missing
    #[error("cloud credentials missing: {0}")]
    CredentialsMissing(String),

    /// Backend refused the request
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl ClientError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Unavailable(_))
    }

    /// Whether the credential broker reported the credentials as absent.
    pub fn is_credentials_missing(&self) -> bool {
        matches!(self, ClientError::CredentialsMissing(_))
    }
}

/// Result type for capability client calls
pub type ClientResult<T> = std::result::Result<T, ClientError>;
