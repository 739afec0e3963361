//! Memoized, dependency-ordered construction of [`Resources`].
//!
//! A [`ResourceBuilder`] is handed to investigations, which call
//! [`build`](ResourceBuilder::build) as often as they like with whatever
//! [`BuildRequest`] they need. Each capability is constructed at most once.
//! The first failure is cached: every later build returns it again without
//! touching a collaborator, until the runner explicitly clears it.

use std::sync::Arc;

use cad_clients::Clients;
use tracing::{debug, info, instrument};

use super::error::{ResourceError, ResourceResult};
use super::grant::ScopedGrant;
use super::notes::NoteWriter;
use super::request::{BuildRequest, Capability};
use super::{ManagementResources, Resources};
use crate::obs::emit_release_failed;

#[derive(Debug, Clone)]
enum BuildState {
    Open,
    Failed(ResourceError),
}

pub struct ResourceBuilder {
    clients: Clients,
    investigation: String,
    api_scope: String,
    requested: BuildRequest,
    resources: Resources,
    state: BuildState,
}

impl ResourceBuilder {
    /// `investigation` titles the note accumulator; `api_scope` names the
    /// permission scope requested for cluster-API grants.
    pub fn new(
        cluster_id: impl Into<String>,
        investigation: impl Into<String>,
        clients: Clients,
        api_scope: impl Into<String>,
    ) -> Self {
        Self {
            clients,
            investigation: investigation.into(),
            api_scope: api_scope.into(),
            requested: BuildRequest::default(),
            resources: Resources::new(cluster_id),
            state: BuildState::Open,
        }
    }

    pub fn cluster_id(&self) -> &str {
        &self.resources.cluster_id
    }

    pub fn investigation(&self) -> &str {
        &self.investigation
    }

    /// Everything built so far, including after a failure.
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Union of every request seen by this builder.
    pub fn requested(&self) -> BuildRequest {
        self.requested
    }

    pub fn failure(&self) -> Option<&ResourceError> {
        match &self.state {
            BuildState::Open => None,
            BuildState::Failed(err) => Some(err),
        }
    }

    /// Forget a cached failure so later builds may proceed. Already-built
    /// capabilities are kept.
    pub fn clear_failure(&mut self) -> Option<ResourceError> {
        match std::mem::replace(&mut self.state, BuildState::Open) {
            BuildState::Open => None,
            BuildState::Failed(err) => Some(err),
        }
    }

    /// Construct whatever `request` needs that is not yet built and return a
    /// snapshot of the resources.
    #[instrument(skip_all, fields(cluster_id = %self.resources.cluster_id))]
    pub async fn build(&mut self, request: BuildRequest) -> ResourceResult<Resources> {
        self.requested = self.requested.merge(request);

        if let BuildState::Failed(err) = &self.state {
            debug!(error = %err, "returning cached build failure");
            return Err(err.clone());
        }

        for capability in request.plan(&self.resources) {
            if let Err(err) = self.construct(capability).await {
                info!(capability = %capability, error = %err, "resource construction failed");
                self.state = BuildState::Failed(err.clone());
                return Err(err);
            }
            debug!(capability = %capability, "resource constructed");
        }

        Ok(self.resources.clone())
    }

    /// Invoke the release of every grant built so far. Returns how many
    /// releases ran; failures are logged and otherwise ignored.
    pub async fn release_all(&self) -> usize {
        let mut released = 0;
        for grant in self.resources.grants() {
            match grant.release().await {
                Some(Ok(())) => {
                    debug!(grant = grant.label(), "ephemeral access released");
                    released += 1;
                }
                Some(Err(err)) => {
                    emit_release_failed(grant.label(), &err);
                    released += 1;
                }
                None => {}
            }
        }
        released
    }

    async fn construct(&mut self, capability: Capability) -> ResourceResult<()> {
        let cluster_id = self.resources.cluster_id.clone();

        match capability {
            Capability::Cluster => {
                let cluster = self
                    .clients
                    .inventory
                    .cluster_descriptor(&cluster_id)
                    .await
                    .map_err(|e| ResourceError::ClusterNotFound {
                        cluster_id: cluster_id.clone(),
                        source: Arc::new(e),
                    })?;
                self.resources.cluster = Some(Arc::new(cluster));
            }
            Capability::CloudAccess => {
                let cluster = self.prerequisite(capability)?;
                let access = self
                    .clients
                    .broker
                    .acquire_tenant_credentials(&cluster)
                    .await
                    .map_err(|e| ResourceError::CloudAccess {
                        cluster_id: cluster_id.clone(),
                        source: Arc::new(e),
                    })?;
                self.resources.cloud_access = Some(Arc::new(access));
            }
            Capability::ApiAccess => {
                let cluster = self.prerequisite(capability)?;
                let provisioned = self
                    .clients
                    .provisioner
                    .provision(&cluster.id, &self.api_scope)
                    .await
                    .map_err(|e| ResourceError::ApiAccess {
                        cluster_id: cluster_id.clone(),
                        source: Arc::new(e),
                    })?;
                let label = format!("api:{}:{}", cluster.id, self.api_scope);
                self.resources.api_access = Some(ScopedGrant::from_provisioned(label, provisioned));
            }
            Capability::CliAccess => {
                let cluster = self.prerequisite(capability)?;
                let provisioned = self
                    .clients
                    .provisioner
                    .provision_cli(&cluster.id)
                    .await
                    .map_err(|e| ResourceError::CliAccess {
                        cluster_id: cluster_id.clone(),
                        source: Arc::new(e),
                    })?;
                let label = format!("cli:{}", cluster.id);
                self.resources.cli_access = Some(ScopedGrant::from_provisioned(label, provisioned));
            }
            Capability::ClusterDeployment => {
                let cluster = self.prerequisite(capability)?;
                let deployment = self
                    .clients
                    .inventory
                    .cluster_deployment(&cluster.id)
                    .await
                    .map_err(|e| ResourceError::ClusterDeploymentNotFound {
                        cluster_id: cluster_id.clone(),
                        source: Arc::new(e),
                    })?;
                self.resources.deployment = Some(Arc::new(deployment));
            }
            Capability::ManagementAccess => {
                let cluster = self.prerequisite(capability)?;
                if !cluster.hosted_control_plane {
                    debug!("cluster has no hosted control plane; management access not needed");
                    self.resources.management_not_applicable = true;
                    return Ok(());
                }

                let info = self
                    .clients
                    .inventory
                    .management_topology(&cluster)
                    .await
                    .map_err(|e| ResourceError::ManagementTopology {
                        cluster_id: cluster_id.clone(),
                        source: Arc::new(e),
                    })?;
                let provisioned = self
                    .clients
                    .provisioner
                    .provision(&info.management_cluster_id, &self.api_scope)
                    .await
                    .map_err(|e| ResourceError::ManagementAccess {
                        cluster_id: cluster_id.clone(),
                        management_cluster_id: info.management_cluster_id.clone(),
                        source: Arc::new(e),
                    })?;
                let label = format!("api:{}:{}", info.management_cluster_id, self.api_scope);
                self.resources.management = Some(ManagementResources {
                    info: Arc::new(info),
                    api_access: ScopedGrant::from_provisioned(label, provisioned),
                });
            }
            Capability::Notes => {
                self.resources.notes = Some(Arc::new(NoteWriter::new(self.investigation.clone())));
            }
        }

        Ok(())
    }

    fn prerequisite(&self, capability: Capability) -> ResourceResult<Arc<cad_clients::Cluster>> {
        self.resources
            .cluster
            .clone()
            .ok_or_else(|| ResourceError::MissingPrerequisite {
                cluster_id: self.resources.cluster_id.clone(),
                capability,
                requires: capability.requires().unwrap_or(Capability::Cluster),
            })
    }
}

impl std::fmt::Debug for ResourceBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceBuilder")
            .field("investigation", &self.investigation)
            .field("requested", &self.requested)
            .field("resources", &self.resources)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
