//! Declarative build requests.
//!
//! A [`BuildRequest`] is a plain value describing which capabilities an
//! investigation needs. [`BuildRequest::plan`] turns it, together with what
//! has already been built, into the ordered list of capabilities still to
//! construct.

use serde::{Deserialize, Serialize};

use super::Resources;

/// One constructible capability. Declaration order is construction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Cluster,
    CloudAccess,
    ApiAccess,
    CliAccess,
    ClusterDeployment,
    ManagementAccess,
    Notes,
}

impl Capability {
    /// Construction order used by [`BuildRequest::plan`].
    pub const ORDER: [Capability; 7] = [
        Capability::Cluster,
        Capability::CloudAccess,
        Capability::ApiAccess,
        Capability::CliAccess,
        Capability::ClusterDeployment,
        Capability::ManagementAccess,
        Capability::Notes,
    ];

    /// The capability that must exist before this one can be built.
    pub fn requires(self) -> Option<Capability> {
        match self {
            Capability::Cluster | Capability::Notes => None,
            _ => Some(Capability::Cluster),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Capability::Cluster => "cluster",
            Capability::CloudAccess => "cloud_access",
            Capability::ApiAccess => "api_access",
            Capability::CliAccess => "cli_access",
            Capability::ClusterDeployment => "cluster_deployment",
            Capability::ManagementAccess => "management_access",
            Capability::Notes => "notes",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// "Want X" flags. Every `with_*` also requests its prerequisite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub cluster: bool,
    pub cloud_access: bool,
    pub api_access: bool,
    pub cli_access: bool,
    pub cluster_deployment: bool,
    pub management_access: bool,
    pub notes: bool,
}

impl BuildRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cluster(mut self) -> Self {
        self.cluster = true;
        self
    }

    pub fn with_cloud_access(mut self) -> Self {
        self.cloud_access = true;
        self.with_cluster()
    }

    /// Scoped cluster-API access; provisions a time-boxed grant.
    pub fn with_api_access(mut self) -> Self {
        self.api_access = true;
        self.with_cluster()
    }

    pub fn with_cli_access(mut self) -> Self {
        self.cli_access = true;
        self.with_cluster()
    }

    pub fn with_cluster_deployment(mut self) -> Self {
        self.cluster_deployment = true;
        self.with_cluster()
    }

    /// Management-cluster API access. Only resolved for hosted control planes.
    pub fn with_management_api_access(mut self) -> Self {
        self.management_access = true;
        self.with_cluster()
    }

    pub fn with_notes(mut self) -> Self {
        self.notes = true;
        self
    }

    pub fn wants(&self, capability: Capability) -> bool {
        match capability {
            Capability::Cluster => self.cluster,
            Capability::CloudAccess => self.cloud_access,
            Capability::ApiAccess => self.api_access,
            Capability::CliAccess => self.cli_access,
            Capability::ClusterDeployment => self.cluster_deployment,
            Capability::ManagementAccess => self.management_access,
            Capability::Notes => self.notes,
        }
    }

    /// Union of two requests.
    pub fn merge(self, other: BuildRequest) -> Self {
        Self {
            cluster: self.cluster || other.cluster,
            cloud_access: self.cloud_access || other.cloud_access,
            api_access: self.api_access || other.api_access,
            cli_access: self.cli_access || other.cli_access,
            cluster_deployment: self.cluster_deployment || other.cluster_deployment,
            management_access: self.management_access || other.management_access,
            notes: self.notes || other.notes,
        }
    }

    /// Capabilities still missing from `built`, in construction order.
    ///
    /// Management access is listed whenever it is wanted and absent; whether
    /// the cluster's topology actually needs it is decided at construction.
    pub fn plan(&self, built: &Resources) -> Vec<Capability> {
        Capability::ORDER
            .into_iter()
            .filter(|c| self.wants(*c) && !built.has(*c))
            .collect()
    }
}
