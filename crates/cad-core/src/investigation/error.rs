//! Classified investigation errors.

use cad_clients::ClientError;

use crate::resources::ResourceError;

/// Boxed cause carried by classified errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every error an investigation can return, classified so the runner can
/// decide between retry and abort.
#[derive(Debug, thiserror::Error)]
pub enum InvestigationError {
    /// Transient fault in a backing system; the investigation may be retried.
    #[error("infrastructure error: {0}")]
    Infrastructure(#[source] BoxError),

    /// Conclusive outcome; retrying cannot change it.
    #[error("investigation finding: {0}")]
    Finding(String),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// The alert was raised for a topology the cluster does not have.
    #[error("alert does not match the cluster topology: {0}")]
    DocumentationMismatch(String),

    /// Anything not classified above. Never retried.
    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

impl InvestigationError {
    pub fn infrastructure(cause: impl Into<BoxError>) -> Self {
        InvestigationError::Infrastructure(cause.into())
    }

    pub fn finding(message: impl Into<String>) -> Self {
        InvestigationError::Finding(message.into())
    }

    pub fn is_infrastructure(&self) -> bool {
        matches!(self, InvestigationError::Infrastructure(_))
    }

    pub fn is_finding(&self) -> bool {
        matches!(self, InvestigationError::Finding(_))
    }

    /// Short label for logs and run reports.
    pub fn class(&self) -> &'static str {
        match self {
            InvestigationError::Infrastructure(_) => "infrastructure",
            InvestigationError::Finding(_) => "finding",
            InvestigationError::Resource(_) => "resource",
            InvestigationError::DocumentationMismatch(_) => "documentation_mismatch",
            InvestigationError::Unclassified(_) => "unclassified",
        }
    }
}

/// Transient collaborator faults are infrastructure errors; anything else a
/// strategy did not classify itself stays unclassified.
impl From<ClientError> for InvestigationError {
    fn from(err: ClientError) -> Self {
        if err.is_transient() {
            InvestigationError::Infrastructure(Box::new(err))
        } else {
            InvestigationError::Unclassified(anyhow::Error::new(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> Vec<InvestigationError> {
        vec![
            InvestigationError::infrastructure("api timeout"),
            InvestigationError::finding("egress blocked"),
            InvestigationError::Resource(ResourceError::MissingPrerequisite {
                cluster_id: "c1".into(),
                capability: crate::resources::Capability::ApiAccess,
                requires: crate::resources::Capability::Cluster,
            }),
            InvestigationError::DocumentationMismatch("classic alert on hcp".into()),
            InvestigationError::Unclassified(anyhow::anyhow!("bug")),
        ]
    }

    #[test]
    fn test_never_both_infrastructure_and_finding() {
        for err in all() {
            assert!(!(err.is_infrastructure() && err.is_finding()), "{err}");
        }
    }

    #[test]
    fn test_client_error_classification() {
        let transient: InvestigationError = ClientError::Unavailable("503".into()).into();
        assert!(transient.is_infrastructure());

        let conclusive: InvestigationError = ClientError::NotFound("node".into()).into();
        assert!(!conclusive.is_infrastructure());
        assert_eq!(conclusive.class(), "unclassified");
    }

    #[test]
    fn test_infrastructure_keeps_source() {
        use std::error::Error;
        let err = InvestigationError::infrastructure(ClientError::Unavailable("503".into()));
        assert!(err.source().unwrap().to_string().contains("503"));
    }
}
