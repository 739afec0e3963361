//! Capability-client trait definitions
//!
//! These traits are the only way the investigation core talks to the outside
//! world:
//! - `AlertingClient`: the alert being investigated (notes, escalation, silence)
//! - `ClusterInventory`: cluster descriptors, deployments, topology, customer-facing records
//! - `CredentialBroker`: tenant-scoped cloud credentials
//! - `AccessProvisioner`: time-boxed cluster-API and CLI grants
//! - `ReportClient`: structured investigation reports
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::model::{
    ApiAccessHandle, CliHandle, CloudAccess, Cluster, ClusterDeployment, LimitedSupportReason,
    ManagementInfo, Provisioned, Report, ServiceLog,
};

/// Client bound to the single alert this process is handling.
#[async_trait]
pub trait AlertingClient: Send + Sync {
    /// Escalate the alert to a human, attaching `note`.
    async fn escalate_with_note(&self, note: &str) -> ClientResult<()>;

    /// Silence the alert, attaching `note`.
    async fn silence_with_note(&self, note: &str) -> ClientResult<()>;

    /// Attach `note` without changing the alert's state.
    async fn add_note(&self, note: &str) -> ClientResult<()>;

    /// Cluster identifier the alert was raised against.
    fn cluster_reference(&self) -> String;

    /// Alert title, used to select an investigation.
    fn alert_title(&self) -> String;
}

#[async_trait]
pub trait ClusterInventory: Send + Sync {
    async fn cluster_descriptor(&self, cluster_id: &str) -> ClientResult<Cluster>;

    async fn cluster_deployment(&self, cluster_id: &str) -> ClientResult<ClusterDeployment>;

    /// Resolve the management cluster serving a hosted control plane.
    async fn management_topology(&self, cluster: &Cluster) -> ClientResult<ManagementInfo>;

    async fn post_service_log(&self, cluster_id: &str, log: &ServiceLog) -> ClientResult<()>;

    async fn post_limited_support_reason(
        &self,
        cluster_id: &str,
        reason: &LimitedSupportReason,
    ) -> ClientResult<()>;
}

#[async_trait]
pub trait CredentialBroker: Send + Sync {
    /// Returns `ClientError::CredentialsMissing` when the tenant has no usable
    /// credentials at all, as opposed to a transient broker fault.
    async fn acquire_tenant_credentials(&self, cluster: &Cluster) -> ClientResult<CloudAccess>;
}

/// Provisions ephemeral access. Every successful call returns a release
/// function the caller is responsible for invoking.
#[async_trait]
pub trait AccessProvisioner: Send + Sync {
    async fn provision(
        &self,
        cluster_id: &str,
        scope: &str,
    ) -> ClientResult<Provisioned<ApiAccessHandle>>;

    async fn provision_cli(&self, cluster_id: &str) -> ClientResult<Provisioned<CliHandle>>;
}

#[async_trait]
pub trait ReportClient: Send + Sync {
    async fn create_report(&self, cluster_id: &str, report: &Report) -> ClientResult<()>;
}

/// The full set of capability clients one run works with.
#[derive(Clone)]
pub struct Clients {
    pub alerting: Arc<dyn AlertingClient>,
    pub inventory: Arc<dyn ClusterInventory>,
    pub broker: Arc<dyn CredentialBroker>,
    pub provisioner: Arc<dyn AccessProvisioner>,
    pub reports: Arc<dyn ReportClient>,
}

impl std::fmt::Debug for Clients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clients")
            .field("cluster_reference", &self.alerting.cluster_reference())
            .finish_non_exhaustive()
    }
}
