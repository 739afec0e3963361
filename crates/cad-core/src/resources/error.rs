//! Error types for resource construction.

use std::sync::Arc;

use cad_clients::ClientError;

use super::request::Capability;

/// A capability could not be constructed for a cluster.
///
/// Cloneable so the builder can hand the same failure back on every later
/// build; the collaborator's error stays reachable through [`cause`](Self::cause)
/// and `Error::source`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResourceError {
    #[error("cluster {cluster_id} could not be retrieved: {source}")]
    ClusterNotFound {
        cluster_id: String,
        #[source]
        source: Arc<ClientError>,
    },

    #[error("cluster deployment for {cluster_id} could not be retrieved: {source}")]
    ClusterDeploymentNotFound {
        cluster_id: String,
        #[source]
        source: Arc<ClientError>,
    },

    #[error("cloud credentials for cluster {cluster_id} could not be acquired: {source}")]
    CloudAccess {
        cluster_id: String,
        #[source]
        source: Arc<ClientError>,
    },

    #[error("scoped API access to cluster {cluster_id} could not be provisioned: {source}")]
    ApiAccess {
        cluster_id: String,
        #[source]
        source: Arc<ClientError>,
    },

    #[error("CLI access to cluster {cluster_id} could not be provisioned: {source}")]
    CliAccess {
        cluster_id: String,
        #[source]
        source: Arc<ClientError>,
    },

    #[error("management topology for hosted cluster {cluster_id} could not be resolved: {source}")]
    ManagementTopology {
        cluster_id: String,
        #[source]
        source: Arc<ClientError>,
    },

    #[error(
        "API access to management cluster {management_cluster_id} (serving {cluster_id}) could not be provisioned: {source}"
    )]
    ManagementAccess {
        cluster_id: String,
        management_cluster_id: String,
        #[source]
        source: Arc<ClientError>,
    },

    #[error("{capability} for cluster {cluster_id} requires {requires}, which was not built")]
    MissingPrerequisite {
        cluster_id: String,
        capability: Capability,
        requires: Capability,
    },
}

impl ResourceError {
    /// The tenant cluster this failure is scoped to.
    pub fn cluster_id(&self) -> &str {
        match self {
            ResourceError::ClusterNotFound { cluster_id, .. }
            | ResourceError::ClusterDeploymentNotFound { cluster_id, .. }
            | ResourceError::CloudAccess { cluster_id, .. }
            | ResourceError::ApiAccess { cluster_id, .. }
            | ResourceError::CliAccess { cluster_id, .. }
            | ResourceError::ManagementTopology { cluster_id, .. }
            | ResourceError::ManagementAccess { cluster_id, .. }
            | ResourceError::MissingPrerequisite { cluster_id, .. } => cluster_id,
        }
    }

    /// The collaborator error behind this failure, if one was involved.
    pub fn cause(&self) -> Option<&ClientError> {
        match self {
            ResourceError::ClusterNotFound { source, .. }
            | ResourceError::ClusterDeploymentNotFound { source, .. }
            | ResourceError::CloudAccess { source, .. }
            | ResourceError::ApiAccess { source, .. }
            | ResourceError::CliAccess { source, .. }
            | ResourceError::ManagementTopology { source, .. }
            | ResourceError::ManagementAccess { source, .. } => Some(source.as_ref()),
            ResourceError::MissingPrerequisite { .. } => None,
        }
    }
}

/// Result type for resource construction.
pub type ResourceResult<T> = std::result::Result<T, ResourceError>;
