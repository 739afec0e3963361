//! Data exchanged between the core and its capability clients.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;

// ---------------------------------------------------------------------------
// Cluster inventory
// ---------------------------------------------------------------------------

/// Cloud provider hosting a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Gcp,
    Azure,
    #[serde(untagged)]
    Other(String),
}

impl CloudProvider {
    pub fn as_str(&self) -> &str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Gcp => "gcp",
            CloudProvider::Azure => "azure",
            CloudProvider::Other(name) => name,
        }
    }
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state reported by the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterState {
    Installing,
    Ready,
    Hibernating,
    Uninstalling,
    Error,
}

/// Cluster descriptor as returned by the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Inventory-internal identifier
    pub id: String,
    /// Identifier used by the alerting system
    pub external_id: String,
    pub name: String,
    pub cloud_provider: CloudProvider,
    pub state: ClusterState,
    /// Control plane runs on a separate management cluster
    pub hosted_control_plane: bool,
    /// Customer has restricted SRE access to the cluster
    pub access_protected: bool,
}

/// Installer-side deployment record for a classic cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDeployment {
    pub name: String,
    pub namespace: String,
    pub installed: bool,
}

/// Where a hosted control plane actually runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementInfo {
    pub management_cluster_id: String,
    pub service_cluster_id: Option<String>,
    /// Namespace on the management cluster holding the tenant's control plane
    pub control_plane_namespace: String,
}

// ---------------------------------------------------------------------------
// Credentials and scoped access
// ---------------------------------------------------------------------------

/// Tenant-scoped cloud credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudAccess {
    pub account_id: String,
    pub region: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for CloudAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudAccess")
            .field("account_id", &self.account_id)
            .field("region", &self.region)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Time-boxed, scoped cluster-API grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiAccessHandle {
    pub cluster_id: String,
    pub scope: String,
    pub endpoint: String,
    pub expires_at: DateTime<Utc>,
}

/// CLI-style access (kubeconfig on disk) for a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliHandle {
    pub cluster_id: String,
    pub kubeconfig_path: std::path::PathBuf,
}

/// Tears down an ephemeral grant. Consumed on use.
pub type ReleaseFn = Box<dyn FnOnce() -> BoxFuture<'static, ClientResult<()>> + Send>;

/// A freshly provisioned handle plus the function that revokes it.
pub struct Provisioned<H> {
    pub handle: H,
    pub release: ReleaseFn,
}

impl<H> Provisioned<H> {
    pub fn new(handle: H, release: ReleaseFn) -> Self {
        Self { handle, release }
    }
}

impl<H: std::fmt::Debug> std::fmt::Debug for Provisioned<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioned")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Outbound records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceLogSeverity {
    Info,
    Warning,
    Major,
    Critical,
}

/// Customer-visible service log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLog {
    pub severity: ServiceLogSeverity,
    pub summary: String,
    pub description: String,
    pub internal_only: bool,
}

/// Reason the cluster is placed into limited support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitedSupportReason {
    pub summary: String,
    pub details: String,
}

/// Structured investigation report attached to a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: String,
    pub data: serde_json::Value,
}
