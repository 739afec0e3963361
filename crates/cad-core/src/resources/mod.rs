//! Resource lifecycle for one investigation run.
//!
//! # Module layout
//!
//! - [`request`]: `BuildRequest`, `Capability` and the pure `plan` function
//! - [`builder`]: `ResourceBuilder`, memoized construction with a cached failure
//! - [`grant`]: `ScopedGrant`, `ReleaseOnce` for ephemeral access
//! - [`notes`]: `NoteWriter`, the run's note accumulator
//! - [`error`]: `ResourceError`, `ResourceResult`

pub mod builder;
pub mod error;
pub mod grant;
pub mod notes;
pub mod request;

use std::sync::Arc;

use cad_clients::{ApiAccessHandle, CliHandle, CloudAccess, Cluster, ClusterDeployment, ManagementInfo};

pub use builder::ResourceBuilder;
pub use error::{ResourceError, ResourceResult};
pub use grant::{ReleaseOnce, ScopedGrant};
pub use notes::{NoteLevel, NoteWriter};
pub use request::{BuildRequest, Capability};

/// Management-side access for a hosted control plane.
#[derive(Debug, Clone)]
pub struct ManagementResources {
    pub info: Arc<ManagementInfo>,
    pub api_access: ScopedGrant<ApiAccessHandle>,
}

/// The capability bag of one run. Grows as builds succeed; never shrinks.
#[derive(Debug, Clone)]
pub struct Resources {
    /// Cluster reference the run was started with.
    pub cluster_id: String,
    pub cluster: Option<Arc<Cluster>>,
    pub cloud_access: Option<Arc<CloudAccess>>,
    pub api_access: Option<ScopedGrant<ApiAccessHandle>>,
    pub cli_access: Option<ScopedGrant<CliHandle>>,
    pub deployment: Option<Arc<ClusterDeployment>>,
    pub management: Option<ManagementResources>,
    pub notes: Option<Arc<NoteWriter>>,
    // Topology check ran and the cluster has no management side.
    management_not_applicable: bool,
}

impl Resources {
    pub fn new(cluster_id: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            cluster: None,
            cloud_access: None,
            api_access: None,
            cli_access: None,
            deployment: None,
            management: None,
            notes: None,
            management_not_applicable: false,
        }
    }

    /// Whether `capability` has already been settled for this run.
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Cluster => self.cluster.is_some(),
            Capability::CloudAccess => self.cloud_access.is_some(),
            Capability::ApiAccess => self.api_access.is_some(),
            Capability::CliAccess => self.cli_access.is_some(),
            Capability::ClusterDeployment => self.deployment.is_some(),
            Capability::ManagementAccess => {
                self.management.is_some() || self.management_not_applicable
            }
            Capability::Notes => self.notes.is_some(),
        }
    }

    /// Releases of every grant constructed so far.
    pub(crate) fn grants(&self) -> Vec<Arc<ReleaseOnce>> {
        let mut grants = Vec::new();
        if let Some(grant) = &self.api_access {
            grants.push(grant.release_handle());
        }
        if let Some(grant) = &self.cli_access {
            grants.push(grant.release_handle());
        }
        if let Some(management) = &self.management {
            grants.push(management.api_access.release_handle());
        }
        grants
    }
}
