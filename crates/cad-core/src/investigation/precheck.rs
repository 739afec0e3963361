//! Cluster-state and fleet-support eligibility checks.

use cad_clients::{CloudProvider, ClusterState};
use tracing::info;

use super::{InvestigationError, InvestigationResult, StopReason};
use crate::actions::Action;
use crate::resources::{BuildRequest, ResourceBuilder};

/// Verify the cluster can be investigated at all.
///
/// Builds the cluster descriptor and the note accumulator. A cluster that is
/// uninstalling gets its alert silenced; unsupported providers and
/// access-protected clusters are escalated. All three stop the run.
pub async fn precheck(
    builder: &mut ResourceBuilder,
    supported_providers: &[CloudProvider],
) -> Result<InvestigationResult, InvestigationError> {
    let resources = builder
        .build(BuildRequest::new().with_cluster().with_notes())
        .await?;
    let Some(cluster) = resources.cluster else {
        return Err(anyhow::anyhow!("cluster descriptor missing after a successful build").into());
    };

    if cluster.state == ClusterState::Uninstalling {
        info!(cluster_id = %cluster.id, "cluster is uninstalling; silencing alert");
        return Ok(InvestigationResult::stop(
            StopReason::ClusterUninstalling,
            vec![Action::silence(
                "Cluster is uninstalling. Silencing the alert; no investigation is needed.",
            )],
        ));
    }

    if !supported_providers.contains(&cluster.cloud_provider) {
        info!(provider = %cluster.cloud_provider, "unsupported cloud provider; escalating");
        return Ok(InvestigationResult::stop(
            StopReason::UnsupportedCloudProvider(cluster.cloud_provider.to_string()),
            vec![Action::escalate(format!(
                "Automated investigation does not support cloud provider '{}'. Manual investigation required.",
                cluster.cloud_provider
            ))],
        ));
    }

    if cluster.access_protected {
        info!("access protection enabled; escalating");
        return Ok(InvestigationResult::stop(
            StopReason::AccessProtected,
            vec![Action::escalate(
                "Cluster has access protection enabled, automated investigation is not possible. Manual investigation required.",
            )],
        ));
    }

    Ok(InvestigationResult::new())
}
